//! Caption sidecar files.
//!
//! Each image `photo.png` gets a `photo.txt` beside it holding its tags joined
//! by `", "` with no trailing newline. Reading splits on commas, trims, and
//! drops empty entries, so `"a,  b ,,c"` reads as `{a, b, c}`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::FileDiscovery;

/// Separator between tags in a sidecar.
pub const SEPARATOR: &str = ", ";

/// Sidecar path for an image: same directory and stem, `.txt` extension.
pub fn sidecar_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

pub fn format_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Parse sidecar contents into a tag set.
pub fn parse_tags(content: &str) -> BTreeSet<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a sidecar file. A missing file reads as no tags.
pub fn read_tags(path: &Path) -> PipelineResult<BTreeSet<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_tags(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(PipelineError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Write tags to a sidecar atomically.
///
/// The content goes to a temporary file in the same directory which is then
/// renamed over the target, so a crash never leaves a half-written caption.
pub fn write_tags<S: AsRef<str>>(path: &Path, tags: &[S]) -> PipelineResult<()> {
    let content = format_tags(tags);
    let tmp = temp_path(path);

    let write_err = |e: std::io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Add one tag to a single image's sidecar, creating it if needed.
///
/// Returns `false` when the tag was already present; the file is left alone.
pub fn add_tag(image: &Path, tag: &str) -> PipelineResult<bool> {
    edit_tags(image, |tags| {
        let tag = tag.trim();
        !tag.is_empty() && tags.insert(tag.to_string())
    })
}

/// Remove one tag from a single image's sidecar.
///
/// Returns `false` when the tag was not present; the file is left alone.
pub fn remove_tag(image: &Path, tag: &str) -> PipelineResult<bool> {
    edit_tags(image, |tags| tags.remove(tag.trim()))
}

fn edit_tags(
    image: &Path,
    edit: impl FnOnce(&mut BTreeSet<String>) -> bool,
) -> PipelineResult<bool> {
    let path = sidecar_path(image);
    let mut tags = read_tags(&path)?;
    if !edit(&mut tags) {
        return Ok(false);
    }
    let sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    write_tags(&path, &sorted)?;
    Ok(true)
}

/// The sidecars of every image in a folder, loaded for bulk editing.
///
/// Images without a sidecar start with an empty tag set. Nothing touches the
/// disk until [`SidecarSet::save`].
#[derive(Debug, Default)]
pub struct SidecarSet {
    tags: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl SidecarSet {
    /// Load the sidecars for every supported image in `dir`.
    pub fn load(dir: &Path, discovery: &FileDiscovery) -> PipelineResult<Self> {
        let mut tags = BTreeMap::new();
        for file in discovery.discover(dir)? {
            let set = read_tags(&sidecar_path(&file.path))?;
            tags.insert(file.path, set);
        }
        tracing::debug!("Loaded {} sidecars from {:?}", tags.len(), dir);
        Ok(Self { tags })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags for one image, if it belongs to the set.
    pub fn tags_for(&self, image: &Path) -> Option<&BTreeSet<String>> {
        self.tags.get(image)
    }

    /// Images and their tags, sorted by image path.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &BTreeSet<String>)> {
        self.tags.iter().map(|(p, t)| (p.as_path(), t))
    }

    /// Add a tag to every image that lacks it. Returns how many changed.
    pub fn add_to_all(&mut self, tag: &str) -> usize {
        let tag = tag.trim();
        if tag.is_empty() {
            return 0;
        }
        self.tags
            .values_mut()
            .filter_map(|set| set.insert(tag.to_string()).then_some(()))
            .count()
    }

    /// Remove a tag from every image that has it. Returns how many changed.
    pub fn remove_from_all(&mut self, tag: &str) -> usize {
        let tag = tag.trim();
        self.tags
            .values_mut()
            .filter_map(|set| set.remove(tag).then_some(()))
            .count()
    }

    /// Tag frequencies across the folder, most common first.
    pub fn frequencies(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in self.tags.values().flatten() {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
        let mut freq: Vec<(String, usize)> =
            counts.into_iter().map(|(t, n)| (t.to_string(), n)).collect();
        freq.sort_by(|a, b| b.1.cmp(&a.1));
        freq
    }

    /// Write every sidecar, tags in sorted order.
    pub fn save(&self) -> PipelineResult<usize> {
        for (image, tags) in &self.tags {
            let sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
            write_tags(&sidecar_path(image), &sorted)?;
        }
        Ok(self.tags.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/data/img/photo.final.png")),
            PathBuf::from("/data/img/photo.final.txt")
        );
    }

    #[test]
    fn test_format_has_no_trailing_newline() {
        assert_eq!(format_tags(&["1girl", "solo", "smile"]), "1girl, solo, smile");
        assert_eq!(format_tags::<&str>(&[]), "");
    }

    #[test]
    fn test_parse_trims_and_drops_empties() {
        let tags = parse_tags(" a,  b ,,c,\n");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        write_tags(&path, &["1girl", "solo", "smile"]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1girl, solo, smile");
        let expected: BTreeSet<String> = ["1girl", "solo", "smile"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(read_tags(&path).unwrap(), expected);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        fs::write(&path, "old").unwrap();
        write_tags(&path, &["new"]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join("x.txt.tmp").exists());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.txt");
        assert!(matches!(
            write_tags(&path, &["a"]),
            Err(PipelineError::Write { .. })
        ));
    }

    #[test]
    fn test_missing_sidecar_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_tags(&dir.path().join("none.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_sidecar_set_edit_and_save() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.jpg", "c.webp"] {
            fs::write(dir.path().join(name), b"img").unwrap();
        }
        fs::write(dir.path().join("a.txt"), "solo, smile").unwrap();
        fs::write(dir.path().join("b.txt"), "smile, outdoors").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let mut set = SidecarSet::load(dir.path(), &discovery).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.tags_for(&dir.path().join("c.webp")).unwrap().is_empty());

        assert_eq!(set.frequencies()[0], ("smile".to_string(), 2));

        assert_eq!(set.add_to_all("highres"), 3);
        assert_eq!(set.add_to_all("highres"), 0);
        assert_eq!(set.remove_from_all("smile"), 2);
        assert_eq!(set.save().unwrap(), 3);

        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "highres, solo"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("b.txt")).unwrap(),
            "highres, outdoors"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("c.txt")).unwrap(),
            "highres"
        );
    }

    #[test]
    fn test_single_image_add_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        let caption = dir.path().join("a.txt");
        fs::write(&caption, "solo, smile").unwrap();

        assert!(add_tag(&image, " highres ").unwrap());
        assert_eq!(fs::read_to_string(&caption).unwrap(), "highres, smile, solo");
        assert!(!add_tag(&image, "solo").unwrap());

        assert!(remove_tag(&image, "smile").unwrap());
        assert!(!remove_tag(&image, "smile").unwrap());
        assert_eq!(fs::read_to_string(&caption).unwrap(), "highres, solo");
    }

    #[test]
    fn test_single_image_add_creates_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("b.jpg");

        assert!(!remove_tag(&image, "solo").unwrap());
        assert!(!dir.path().join("b.txt").exists());

        assert!(add_tag(&image, "solo").unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "solo");
    }
}
