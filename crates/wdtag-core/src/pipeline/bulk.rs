//! Folder-wide tagging: classify every candidate image and write its sidecar.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::sidecar::{sidecar_path, write_tags};
use crate::tagging::{Classifier, ThresholdStrategy};
use crate::types::{BulkOutcome, SidecarOptions};

use super::decode::ImageDecoder;
use super::discovery::{DiscoveredFile, FileDiscovery};

/// Runs a classifier over a directory, one file at a time.
///
/// A failure on one file (unreadable, undecodable, inference error, sidecar
/// write error) is recorded in that file's [`BulkOutcome`] and the run moves
/// on to the next file.
pub struct BulkRunner {
    decoder: ImageDecoder,
    discovery: FileDiscovery,
    sidecar: SidecarOptions,
}

impl BulkRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            discovery: FileDiscovery::new(config.processing.clone()),
            sidecar: SidecarOptions::from(&config.tagging),
        }
    }

    /// Override which categories end up in written sidecars.
    pub fn with_sidecar_options(mut self, options: SidecarOptions) -> Self {
        self.sidecar = options;
        self
    }

    /// Candidate images in `dir`, in processing order.
    pub fn candidates(&self, dir: &Path) -> std::result::Result<Vec<DiscoveredFile>, PipelineError> {
        self.discovery.discover(dir)
    }

    /// Tag every candidate image in `dir`.
    ///
    /// Fails only when `dir` is missing or not a directory. Outcomes come back
    /// in path order, one per candidate.
    pub fn run(
        &self,
        classifier: &Classifier,
        dir: &Path,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
    ) -> std::result::Result<Vec<BulkOutcome>, PipelineError> {
        self.run_with_progress(classifier, dir, general, character, |_, _| {})
    }

    /// Like [`BulkRunner::run`], calling `on_outcome(outcome, total)` after
    /// each file.
    pub fn run_with_progress<F>(
        &self,
        classifier: &Classifier,
        dir: &Path,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
        mut on_outcome: F,
    ) -> std::result::Result<Vec<BulkOutcome>, PipelineError>
    where
        F: FnMut(&BulkOutcome, usize),
    {
        let files = self.discovery.discover(dir)?;
        let total = files.len();
        tracing::info!(
            "Tagging {} images in {:?} ({} bytes)",
            total,
            dir,
            FileDiscovery::total_size(&files)
        );

        for (sidecar, images) in shared_sidecars(&files) {
            tracing::warn!(
                "{} images share the sidecar {:?}; the last one tagged wins: {:?}",
                images.len(),
                sidecar,
                images
            );
        }

        let start = std::time::Instant::now();
        let mut outcomes = Vec::with_capacity(total);

        for file in files {
            let outcome = match self.process_one(classifier, &file.path, general, character) {
                Ok(()) => BulkOutcome::succeeded(file.path),
                Err(e) => {
                    tracing::warn!("Failed to tag {:?}: {}", file.path, e);
                    BulkOutcome::failed(file.path, e.to_string())
                }
            };
            on_outcome(&outcome, total);
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        tracing::info!(
            "Tagged {} of {} images in {:?} ({} failed)",
            total - failed,
            total,
            start.elapsed(),
            failed
        );

        Ok(outcomes)
    }

    fn process_one(
        &self,
        classifier: &Classifier,
        path: &Path,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
    ) -> Result<()> {
        let start = std::time::Instant::now();

        let decoded = self.decoder.decode(path)?;
        let prediction = classifier.predict(&decoded.image, general, character)?;
        let tags = prediction.sidecar_tags(&self.sidecar);
        write_tags(&sidecar_path(path), tags.as_slice())?;

        tracing::debug!(
            "Tagged {:?} in {:?} ({} tags)",
            path,
            start.elapsed(),
            tags.len()
        );
        Ok(())
    }
}

/// Sidecar paths claimed by more than one candidate (`x.png` and `x.jpg`).
fn shared_sidecars(files: &[DiscoveredFile]) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut by_sidecar: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        by_sidecar
            .entry(sidecar_path(&file.path))
            .or_default()
            .push(file.path.clone());
    }
    by_sidecar
        .into_iter()
        .filter(|(_, images)| images.len() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::inference::InferenceEngine;
    use crate::tagging::{LabelSpace, Thresholds};
    use image::{Rgb, RgbImage};
    use ndarray::Array4;
    use std::sync::Arc;

    const VOCAB: &str = "name,category\ngeneral,9\nexplicit,9\nsolo,0\nsmile,0\nmiku,4\n";

    struct StubEngine;

    impl InferenceEngine for StubEngine {
        fn input_size(&self) -> u32 {
            8
        }

        fn score(&self, _tensor: &Array4<f32>) -> std::result::Result<Vec<f32>, InferenceError> {
            Ok(vec![0.2, 0.7, 0.5, 0.9, 0.95])
        }
    }

    fn classifier() -> Classifier {
        let labels = Arc::new(LabelSpace::from_reader(VOCAB.as_bytes()).unwrap());
        Classifier::new(Box::new(StubEngine), labels, Thresholds::default()).unwrap()
    }

    fn write_image(dir: &Path, name: &str) {
        RgbImage::from_pixel(5, 3, Rgb([9, 9, 9]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_writes_general_then_character() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "one.png");

        let runner = BulkRunner::new(&Config::default());
        let outcomes = runner
            .run(
                &classifier(),
                dir.path(),
                ThresholdStrategy::Fixed,
                ThresholdStrategy::Fixed,
            )
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].file_name, "one.png");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("one.txt")).unwrap(),
            "smile, solo, miku"
        );
    }

    #[test]
    fn test_sidecar_options() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "one.png");

        let runner = BulkRunner::new(&Config::default()).with_sidecar_options(SidecarOptions {
            include_rating: true,
            exclude_character: true,
        });
        runner
            .run(
                &classifier(),
                dir.path(),
                ThresholdStrategy::Fixed,
                ThresholdStrategy::Fixed,
            )
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("one.txt")).unwrap(),
            "explicit, smile, solo"
        );
    }

    #[test]
    fn test_progress_callback_sees_every_file() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png");
        write_image(dir.path(), "b.png");
        std::fs::write(dir.path().join("c.png"), b"garbage").unwrap();

        let mut seen = Vec::new();
        let runner = BulkRunner::new(&Config::default());
        runner
            .run_with_progress(
                &classifier(),
                dir.path(),
                ThresholdStrategy::Fixed,
                ThresholdStrategy::Fixed,
                |outcome, total| seen.push((outcome.file_name.clone(), outcome.success, total)),
            )
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("a.png".to_string(), true, 3),
                ("b.png".to_string(), true, 3),
                ("c.png".to_string(), false, 3),
            ]
        );
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BulkRunner::new(&Config::default());
        let result = runner.run(
            &classifier(),
            &dir.path().join("absent"),
            ThresholdStrategy::Fixed,
            ThresholdStrategy::Fixed,
        );
        assert!(matches!(result, Err(PipelineError::FileNotFound(_))));
    }

    #[test]
    fn test_empty_dir_yields_no_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BulkRunner::new(&Config::default());
        let outcomes = runner
            .run(
                &classifier(),
                dir.path(),
                ThresholdStrategy::Adaptive,
                ThresholdStrategy::Adaptive,
            )
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_shared_sidecars() {
        let files: Vec<DiscoveredFile> = ["/d/x.jpg", "/d/x.png", "/d/y.png"]
            .iter()
            .map(|p| DiscoveredFile {
                path: PathBuf::from(p),
                size: 0,
            })
            .collect();

        assert_eq!(
            shared_sidecars(&files),
            vec![(
                PathBuf::from("/d/x.txt"),
                vec![PathBuf::from("/d/x.jpg"), PathBuf::from("/d/x.png")]
            )]
        );
        assert!(shared_sidecars(&files[1..]).is_empty());
    }

    #[test]
    fn test_same_stem_images_both_tagged() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "x.png");
        RgbImage::from_pixel(5, 3, Rgb([9, 9, 9]))
            .save_with_format(dir.path().join("x.jpg"), image::ImageFormat::Jpeg)
            .unwrap();

        let runner = BulkRunner::new(&Config::default());
        let outcomes = runner
            .run(
                &classifier(),
                dir.path(),
                ThresholdStrategy::Fixed,
                ThresholdStrategy::Fixed,
            )
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));
        assert!(dir.path().join("x.txt").exists());
    }
}
