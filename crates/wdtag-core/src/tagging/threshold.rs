//! Per-category confidence cutoffs.
//!
//! A cutoff is either a fixed configured value or the max-cut ("MCut")
//! threshold: the midpoint of the largest gap between adjacent scores once
//! they are sorted high to low. MCut adapts to each image's confidence
//! distribution instead of applying one global number.

use serde::{Deserialize, Serialize};

/// How a category's cutoff is chosen, as requested by the caller.
///
/// `Fixed` uses the classifier's configured threshold for that category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStrategy {
    #[default]
    Fixed,
    Adaptive,
}

impl ThresholdStrategy {
    pub fn from_mcut(mcut: bool) -> Self {
        if mcut {
            Self::Adaptive
        } else {
            Self::Fixed
        }
    }

    /// Resolve into a concrete mode using the configured fixed value.
    pub fn with_fixed(self, value: f32) -> ThresholdMode {
        match self {
            Self::Fixed => ThresholdMode::Fixed(value),
            Self::Adaptive => ThresholdMode::Adaptive,
        }
    }
}

/// A resolved threshold mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdMode {
    Fixed(f32),
    Adaptive,
}

impl ThresholdMode {
    /// Pick the cutoff for one category's scores.
    pub fn select(self, scores: &[f32]) -> f32 {
        match self {
            Self::Fixed(value) => value,
            Self::Adaptive => mcut_threshold(scores).unwrap_or_else(|| fallback(scores)),
        }
    }
}

/// Max-cut threshold, or `None` when there are fewer than two scores.
///
/// The first largest gap wins when several gaps are equal.
pub fn mcut_threshold(scores: &[f32]) -> Option<f32> {
    if scores.len() < 2 {
        return None;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let (gap_at, _) = sorted
        .windows(2)
        .map(|w| w[0] - w[1])
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, diff)| {
            if diff > best.1 {
                (i, diff)
            } else {
                best
            }
        });

    Some((sorted[gap_at] + sorted[gap_at + 1]) / 2.0)
}

/// Cutoff for categories too small to have a gap.
///
/// Uses the lowest observed score, so with a strict `>` filter nothing in a
/// single-label category passes. An empty category gets 1.0.
fn fallback(scores: &[f32]) -> f32 {
    scores.iter().copied().reduce(f32::min).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcut_midpoint_of_largest_gap() {
        let t = mcut_threshold(&[0.9, 0.8, 0.3, 0.2]).unwrap();
        assert!((t - 0.55).abs() < 1e-6, "got {t}");
    }

    #[test]
    fn test_mcut_ignores_input_order() {
        let t = mcut_threshold(&[0.2, 0.9, 0.3, 0.8]).unwrap();
        assert!((t - 0.55).abs() < 1e-6, "got {t}");
    }

    #[test]
    fn test_mcut_two_scores() {
        let t = mcut_threshold(&[0.1, 0.7]).unwrap();
        assert!((t - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_mcut_first_gap_wins_ties() {
        // Gaps: 0.25 (1.0 -> 0.75), 0.25 (0.75 -> 0.5), 0.25 (0.5 -> 0.25)
        let t = mcut_threshold(&[1.0, 0.75, 0.5, 0.25]).unwrap();
        assert_eq!(t, 0.875);
    }

    #[test]
    fn test_mcut_needs_two_scores() {
        assert_eq!(mcut_threshold(&[]), None);
        assert_eq!(mcut_threshold(&[0.4]), None);
    }

    #[test]
    fn test_fixed_mode_returns_value() {
        assert_eq!(ThresholdMode::Fixed(0.35).select(&[0.9, 0.1]), 0.35);
        assert_eq!(ThresholdMode::Fixed(0.85).select(&[]), 0.85);
    }

    #[test]
    fn test_adaptive_fallback_for_small_categories() {
        assert_eq!(ThresholdMode::Adaptive.select(&[0.4]), 0.4);
        assert_eq!(ThresholdMode::Adaptive.select(&[]), 1.0);
    }

    #[test]
    fn test_strategy_resolution() {
        assert_eq!(
            ThresholdStrategy::Fixed.with_fixed(0.35),
            ThresholdMode::Fixed(0.35)
        );
        assert_eq!(
            ThresholdStrategy::Adaptive.with_fixed(0.35),
            ThresholdMode::Adaptive
        );
        assert_eq!(ThresholdStrategy::from_mcut(true), ThresholdStrategy::Adaptive);
        assert_eq!(ThresholdStrategy::default(), ThresholdStrategy::Fixed);
    }
}
