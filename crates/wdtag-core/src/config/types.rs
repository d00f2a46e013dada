//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.wdtag/models"),
        }
    }
}

/// Model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model variant directory under `model_dir` ("wd-vit-tagger-v3", "wd-vit-large-tagger-v3")
    pub name: String,

    /// Square input size used when the model declares a dynamic input dimension.
    pub image_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "wd-vit-tagger-v3".to_string(),
            image_size: 448,
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// File extensions treated as candidate images (matched case-insensitively)
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: ["jpg", "jpeg", "png", "bmp", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// Tagging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Fixed cutoff for general tags
    pub general_threshold: f32,

    /// Fixed cutoff for character tags
    pub character_threshold: f32,

    /// Use max-cut thresholding for general tags instead of the fixed cutoff
    pub general_mcut: bool,

    /// Use max-cut thresholding for character tags instead of the fixed cutoff
    pub character_mcut: bool,

    /// Prepend the top rating label to written sidecars
    pub include_rating: bool,

    /// Leave character tags out of written sidecars
    pub exclude_character: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            general_threshold: 0.35,
            character_threshold: 0.85,
            general_mcut: false,
            character_mcut: false,
            include_rating: false,
            exclude_character: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
