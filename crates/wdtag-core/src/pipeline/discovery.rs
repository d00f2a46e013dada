//! Candidate image enumeration for bulk runs.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// Finds taggable images directly inside a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// List the supported image files in `dir`, sorted by path.
    ///
    /// Only the top level is scanned; subdirectories are not entered.
    pub fn discover(&self, dir: &Path) -> Result<Vec<DiscoveredFile>, PipelineError> {
        if !dir.exists() {
            return Err(PipelineError::FileNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(PipelineError::NotADirectory(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() || !self.is_supported(entry.path()) {
                        continue;
                    }
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    files.push(DiscoveredFile {
                        path: entry.into_path(),
                        size,
                    });
                }
                // A broken link or unreadable entry with a supported extension
                // stays a candidate so the run reports it as failed.
                Err(e) => match e.path() {
                    Some(path) if self.is_supported(path) => {
                        tracing::debug!("Keeping unreadable candidate {:?}: {}", path, e);
                        files.push(DiscoveredFile {
                            path: path.to_path_buf(),
                            size: 0,
                        });
                    }
                    _ => tracing::warn!("Skipping directory entry in {:?}: {}", dir, e),
                },
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Check if a file has a supported extension (case-insensitive).
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn discovery() -> FileDiscovery {
        FileDiscovery::new(ProcessingConfig::default())
    }

    #[test]
    fn test_is_supported() {
        let discovery = discovery();

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(discovery.is_supported(Path::new("test.bmp")));
        assert!(discovery.is_supported(Path::new("test.WebP")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("test.gif")));
        assert!(!discovery.is_supported(Path::new("png")));
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "anim.gif", "c.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.png"), b"x").unwrap();

        let files = discovery().discover(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.JPG", "b.png", "c.webp"]);
        assert_eq!(FileDiscovery::total_size(&files), 3);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discovery().discover(&missing),
            Err(PipelineError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_discover_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            discovery().discover(&file),
            Err(PipelineError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_keeps_dangling_link() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("b.png"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("c.txt"))
            .unwrap();

        let files = discovery().discover(dir.path()).unwrap();
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![dir.path().join("a.png"), dir.path().join("b.png")]
        );
        assert_eq!(files[1].size, 0);
    }
}
