//! Per-image prediction: preprocess, score, split by category, threshold, rank.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use crate::config::validate::check_threshold;
use crate::error::{ConfigError, InferenceError};
use crate::inference::{preprocess, InferenceEngine};
use crate::types::{CategoryScores, PredictionResult, Tag};

use super::label_space::{LabelSpace, TagCategory};
use super::threshold::{ThresholdMode, ThresholdStrategy};

/// Fixed cutoffs for the two filtered categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub general: f32,
    pub character: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            general: 0.35,
            character: 0.85,
        }
    }
}

impl From<&crate::config::TaggingConfig> for Thresholds {
    fn from(config: &crate::config::TaggingConfig) -> Self {
        Self {
            general: config.general_threshold,
            character: config.character_threshold,
        }
    }
}

/// Turns images into categorized, thresholded, ranked tags.
pub struct Classifier {
    engine: Box<dyn InferenceEngine>,
    labels: Arc<LabelSpace>,
    thresholds: Thresholds,
}

impl Classifier {
    /// Create a classifier.
    ///
    /// `engine` and `labels` must come from the same model release: the
    /// engine's output positions are read through the vocabulary's row order.
    pub fn new(
        engine: Box<dyn InferenceEngine>,
        labels: Arc<LabelSpace>,
        thresholds: Thresholds,
    ) -> Result<Self, ConfigError> {
        check_threshold("general threshold", thresholds.general)?;
        check_threshold("character threshold", thresholds.character)?;
        Ok(Self {
            engine,
            labels,
            thresholds,
        })
    }

    /// Replace the fixed cutoffs used by subsequent predictions.
    pub fn set_thresholds(&mut self, general: f32, character: f32) -> Result<(), ConfigError> {
        check_threshold("general threshold", general)?;
        check_threshold("character threshold", character)?;
        self.thresholds = Thresholds { general, character };
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    /// Square input size the underlying model expects.
    pub fn input_size(&self) -> u32 {
        self.engine.input_size()
    }

    /// Classify one image.
    pub fn predict(
        &self,
        image: &DynamicImage,
        general: ThresholdStrategy,
        character: ThresholdStrategy,
    ) -> Result<PredictionResult, InferenceError> {
        // Snapshot the cutoffs once so the whole call sees one configuration.
        let thresholds = self.thresholds;

        let start = std::time::Instant::now();
        let tensor = preprocess(image, self.engine.input_size());
        let preprocess_time = start.elapsed();

        let infer_start = std::time::Instant::now();
        let scores = self.engine.score(&tensor)?;
        tracing::trace!(
            "  Preprocess: {:?}, inference: {:?}",
            preprocess_time,
            infer_start.elapsed()
        );

        self.classify_scores(
            &scores,
            general.with_fixed(thresholds.general),
            character.with_fixed(thresholds.character),
        )
    }

    /// Build a prediction from a raw score vector.
    ///
    /// Split out from [`Classifier::predict`] so callers that already hold
    /// scores (or tests) can skip preprocessing and inference.
    pub fn classify_scores(
        &self,
        scores: &[f32],
        general_mode: ThresholdMode,
        character_mode: ThresholdMode,
    ) -> Result<PredictionResult, InferenceError> {
        if scores.len() != self.labels.len() {
            return Err(InferenceError::OutputLength {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }

        let rating = self.category_scores(scores, TagCategory::Rating);
        let (general_scores, general_threshold) =
            self.filtered(scores, TagCategory::General, general_mode);
        let (character_scores, character_threshold) =
            self.filtered(scores, TagCategory::Character, character_mode);

        Ok(PredictionResult {
            general: general_scores.ranked_names(),
            rating,
            character: character_scores.ranked_names(),
            general_scores,
            character_scores,
            general_threshold,
            character_threshold,
        })
    }

    fn category_scores(&self, scores: &[f32], category: TagCategory) -> CategoryScores {
        let tags = self
            .labels
            .category_indexes(category)
            .iter()
            .map(|&i| Tag::new(self.labels.entries()[i].name.clone(), scores[i]))
            .collect();
        CategoryScores::new(tags)
    }

    /// Scores of one category strictly above its cutoff, plus the cutoff used.
    fn filtered(
        &self,
        scores: &[f32],
        category: TagCategory,
        mode: ThresholdMode,
    ) -> (CategoryScores, f32) {
        let indexes = self.labels.category_indexes(category);
        let category_scores: Vec<f32> = indexes.iter().map(|&i| scores[i]).collect();
        let threshold = mode.select(&category_scores);

        let tags = indexes
            .iter()
            .filter(|&&i| scores[i] > threshold)
            .map(|&i| Tag::new(self.labels.entries()[i].name.clone(), scores[i]))
            .collect();
        (CategoryScores::new(tags), threshold)
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model: {}, General Threshold: {:.2}, Character Threshold: {:.2}, Labels: {}",
            self.engine.name(),
            self.thresholds.general,
            self.thresholds.character,
            self.labels.len()
        )
    }
}
