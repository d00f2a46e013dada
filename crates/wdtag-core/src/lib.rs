//! wdtag Core - multi-label image tagging with WD tagger models.
//!
//! Takes images, runs them through a WD (waifu diffusion) tagger exported to
//! ONNX, and produces rating, general and character tags. Bulk runs write a
//! `.txt` caption sidecar next to every image.
//!
//! # Architecture
//!
//! ```text
//! Image → Decode → Preprocess (BGR, NHWC) → ONNX scores → Threshold/Rank → Sidecar
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use wdtag_core::{Config, Tagger, ThresholdStrategy};
//!
//! fn main() -> wdtag_core::Result<()> {
//!     let tagger = Tagger::load(Config::load()?)?;
//!
//!     let result = tagger.tag_file(
//!         "./image.jpg".as_ref(),
//!         ThresholdStrategy::Fixed,
//!         ThresholdStrategy::Adaptive,
//!     )?;
//!     println!("Tags: {}", result.combined_tags().join(", "));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod inference;
pub mod pipeline;
pub mod sidecar;
pub mod tagging;
pub mod types;

pub use config::Config;
pub use error::{
    ConfigError, InferenceError, LoadError, PipelineError, PipelineResult, Result, TaggerError,
};
pub use inference::{InferenceEngine, OnnxEngine};
pub use pipeline::{BulkRunner, ImageDecoder};
pub use tagging::{Classifier, LabelSpace, ThresholdMode, ThresholdStrategy, Thresholds};
pub use types::{BulkOutcome, BulkSummary, CategoryScores, PredictionResult, SidecarOptions, Tag};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The main entry point: a loaded model plus the file-level pipeline around it.
pub struct Tagger {
    config: Config,
    classifier: Classifier,
    decoder: ImageDecoder,
    runner: BulkRunner,
}

impl Tagger {
    /// Load the configured model and its vocabulary.
    pub fn load(config: Config) -> Result<Self> {
        tracing::debug!("Initializing wdtag v{}", VERSION);

        let labels = LabelSpace::load(&config.labels_path())?;
        let engine = OnnxEngine::load(&config.model_path(), config.model.image_size)?;
        Self::with_engine(config, Box::new(engine), labels)
    }

    /// Build a tagger around an already-constructed engine.
    pub fn with_engine(
        config: Config,
        engine: Box<dyn InferenceEngine>,
        labels: LabelSpace,
    ) -> Result<Self> {
        let classifier = Classifier::new(
            engine,
            Arc::new(labels),
            Thresholds::from(&config.tagging),
        )?;
        tracing::info!("{}", classifier);

        Ok(Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            runner: BulkRunner::new(&config),
            classifier,
            config,
        })
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Change the fixed cutoffs for subsequent calls.
    pub fn set_thresholds(&mut self, general: f32, character: f32) -> Result<()> {
        self.classifier.set_thresholds(general, character)?;
        self.config.tagging.general_threshold = general;
        self.config.tagging.character_threshold = character;
        Ok(())
    }

    /// Per-category strategies from the `[tagging]` mcut flags.
    pub fn default_strategies(&self) -> (ThresholdStrategy, ThresholdStrategy) {
        (
            ThresholdStrategy::from_mcut(self.config.tagging.general_mcut),
            ThresholdStrategy::from_mcut(self.config.tagging.character_mcut),
        )
    }

    /// Decode and classify a single image. Nothing is written.
    pub fn tag_file(
        &self,
        path: &Path,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
    ) -> Result<PredictionResult> {
        let decoded = self.decoder.decode(path)?;
        Ok(self.classifier.predict(&decoded.image, general, character)?)
    }

    /// Write the sidecar for one image using the configured sidecar options.
    pub fn write_sidecar(&self, image: &Path, result: &PredictionResult) -> Result<PathBuf> {
        let path = sidecar::sidecar_path(image);
        let tags = result.sidecar_tags(&SidecarOptions::from(&self.config.tagging));
        sidecar::write_tags(&path, tags.as_slice())?;
        Ok(path)
    }

    /// Tag every supported image in `dir`, writing sidecars.
    pub fn tag_folder<F>(
        &self,
        dir: &Path,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
        on_outcome: F,
    ) -> Result<Vec<BulkOutcome>>
    where
        F: FnMut(&BulkOutcome, usize),
    {
        Ok(self
            .runner
            .run_with_progress(&self.classifier, dir, general, character, on_outcome)?)
    }

    /// Number of images a folder run would process.
    pub fn count_candidates(&self, dir: &Path) -> Result<usize> {
        Ok(self.runner.candidates(dir)?.len())
    }
}
