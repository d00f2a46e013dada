//! Command implementations for the `wdtag` binary.

pub mod bulk;
pub mod config;
pub mod models;
pub mod tag;
pub mod tags;

use std::path::{Path, PathBuf};

use clap::Args;
use wdtag_core::{Config, Tagger};

/// Threshold flags shared by `tag` and `bulk`.
#[derive(Args, Debug, Default, Clone)]
pub struct ThresholdArgs {
    /// Fixed cutoff for general tags (overrides config)
    #[arg(long, value_name = "0..1")]
    pub general_threshold: Option<f32>,

    /// Fixed cutoff for character tags (overrides config)
    #[arg(long, value_name = "0..1")]
    pub character_threshold: Option<f32>,

    /// Use max-cut thresholding for both general and character tags
    #[arg(long)]
    pub mcut: bool,

    /// Use max-cut thresholding for general tags
    #[arg(long)]
    pub general_mcut: bool,

    /// Use max-cut thresholding for character tags
    #[arg(long)]
    pub character_mcut: bool,
}

impl ThresholdArgs {
    /// Fold the flags into the `[tagging]` section.
    pub fn apply(&self, config: &mut Config) {
        if let Some(t) = self.general_threshold {
            config.tagging.general_threshold = t;
        }
        if let Some(t) = self.character_threshold {
            config.tagging.character_threshold = t;
        }
        if self.mcut || self.general_mcut {
            config.tagging.general_mcut = true;
        }
        if self.mcut || self.character_mcut {
            config.tagging.character_mcut = true;
        }
    }
}

/// Load config, apply threshold overrides, and load the model.
pub(crate) fn load_tagger(thresholds: &ThresholdArgs) -> anyhow::Result<Tagger> {
    let mut config = Config::load()?;
    thresholds.apply(&mut config);
    config.validate()?;

    let model_path = config.model_path();
    let labels_path = config.labels_path();
    if !model_path.exists() || !labels_path.exists() {
        anyhow::bail!(
            "Model '{}' is not installed (looked in {:?}).\n\n  \
             Hint: Run `wdtag models download --model {}` first.",
            config.model.name,
            config.variant_dir(),
            config.model.name
        );
    }

    Ok(Tagger::load(config)?)
}

/// Expand a leading `~` in a user-supplied path.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
