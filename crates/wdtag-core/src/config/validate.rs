//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Check that a threshold lies in [0, 1].
pub(crate) fn check_threshold(name: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 0.0 and 1.0 (got {value})"
        )));
    }
    Ok(())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.name must not be empty".into(),
            ));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        check_threshold("tagging.general_threshold", self.tagging.general_threshold)?;
        check_threshold(
            "tagging.character_threshold",
            self.tagging.character_threshold,
        )?;
        Ok(())
    }
}
