//! Configuration management for wdtag.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/wdtag/config.toml` on Linux) with defaults for every field.

mod types;
pub(crate) mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the ONNX model inside a model directory.
pub const MODEL_FILENAME: &str = "model.onnx";

/// File name of the label vocabulary inside a model directory.
pub const LABELS_FILENAME: &str = "selected_tags.csv";

/// Root configuration structure for wdtag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Model selection
    pub model: ModelConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Tagging settings
    pub tagging: TaggingConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.wdtag.wdtag/config.toml
    /// - Linux: ~/.config/wdtag/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\wdtag\wdtag\config\config.toml
    ///
    /// Falls back to ~/.wdtag/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "wdtag", "wdtag")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".wdtag").join("config.toml")
            })
    }

    /// Get the resolved model root directory (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding the selected model variant and its vocabulary.
    pub fn variant_dir(&self) -> PathBuf {
        self.model_dir().join(&self.model.name)
    }

    /// Path to the selected model's ONNX file.
    pub fn model_path(&self) -> PathBuf {
        self.variant_dir().join(MODEL_FILENAME)
    }

    /// Path to the selected model's label vocabulary.
    ///
    /// Lives next to the model so the two always come from the same release.
    pub fn labels_path(&self) -> PathBuf {
        self.variant_dir().join(LABELS_FILENAME)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tagging.general_threshold, 0.35);
        assert_eq!(config.tagging.character_threshold, 0.85);
        assert!(!config.tagging.include_rating);
        assert!(!config.tagging.exclude_character);
        assert_eq!(config.model.name, "wd-vit-tagger-v3");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[tagging]"));
        assert!(toml.contains("general_threshold"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("[tagging]\ngeneral_threshold = 0.5\n").unwrap();
        assert_eq!(config.tagging.general_threshold, 0.5);
        assert_eq!(config.tagging.character_threshold, 0.85);
        assert_eq!(config.limits.max_file_size_mb, 100);
    }

    #[test]
    fn test_from_toml_validates() {
        let err = Config::from_toml("[tagging]\ncharacter_threshold = 2.0\n").unwrap_err();
        assert!(err.to_string().contains("character_threshold"));
    }

    #[test]
    fn test_model_and_labels_share_variant_dir() {
        let mut config = Config::default();
        config.general.model_dir = PathBuf::from("/models");
        config.model.name = "wd-vit-large-tagger-v3".to_string();
        assert_eq!(
            config.model_path(),
            PathBuf::from("/models/wd-vit-large-tagger-v3/model.onnx")
        );
        assert_eq!(
            config.labels_path(),
            PathBuf::from("/models/wd-vit-large-tagger-v3/selected_tags.csv")
        );
    }
}
