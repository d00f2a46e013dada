//! Multi-label tagging with WD tagger models.
//!
//! The vocabulary ([`LabelSpace`]) maps each model output position to a tag
//! name and category. The [`Classifier`] splits a score vector by category,
//! applies a fixed or max-cut cutoff ([`threshold`]) to general and character
//! tags, and ranks what survives.

pub mod classifier;
pub mod label_space;
pub mod threshold;

pub use classifier::{Classifier, Thresholds};
pub use label_space::{LabelEntry, LabelSpace, TagCategory};
pub use threshold::{mcut_threshold, ThresholdMode, ThresholdStrategy};
