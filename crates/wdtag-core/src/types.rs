//! Core data types returned by the tagging pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A tag name with its model confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// The label as it appears in the vocabulary (e.g., "1girl", "smile")
    pub name: String,

    /// Confidence score from 0.0 to 1.0
    pub confidence: f32,
}

impl Tag {
    /// Create a new tag with the given name and confidence.
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Scores for one category, in vocabulary order.
///
/// Used both for the unfiltered rating distribution and for the
/// threshold-filtered general/character results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryScores(Vec<Tag>);

impl CategoryScores {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self(tags)
    }

    /// Look up the score for a label name.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.iter().find(|t| t.name == name).map(|t| t.confidence)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// The highest-scoring entry. Earlier entries win ties.
    pub fn top(&self) -> Option<&Tag> {
        self.0
            .iter()
            .reduce(|best, t| if t.confidence > best.confidence { t } else { best })
    }

    /// Label names sorted by descending confidence.
    ///
    /// The sort is stable, so exact ties keep vocabulary order.
    pub fn ranked_names(&self) -> Vec<String> {
        let mut sorted: Vec<&Tag> = self.0.iter().collect();
        sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        sorted.into_iter().map(|t| t.name.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a CategoryScores {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The complete output of classifying one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// General tags above threshold, highest confidence first
    pub general: Vec<String>,

    /// Every rating label with its raw score (never filtered)
    pub rating: CategoryScores,

    /// Character tags above threshold, highest confidence first
    pub character: Vec<String>,

    /// Filtered general tags with their scores, in vocabulary order
    pub general_scores: CategoryScores,

    /// Filtered character tags with their scores, in vocabulary order
    pub character_scores: CategoryScores,

    /// Cutoff applied to general tags for this image
    pub general_threshold: f32,

    /// Cutoff applied to character tags for this image
    pub character_threshold: f32,
}

impl PredictionResult {
    /// Tags in sidecar order: general first, then character.
    pub fn combined_tags(&self) -> Vec<String> {
        self.general
            .iter()
            .chain(self.character.iter())
            .cloned()
            .collect()
    }

    /// Tags for a sidecar file under the given options.
    pub fn sidecar_tags(&self, options: &SidecarOptions) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.general.len() + self.character.len() + 1);
        if options.include_rating {
            if let Some(top) = self.rating.top() {
                tags.push(top.name.clone());
            }
        }
        tags.extend(self.general.iter().cloned());
        if !options.exclude_character {
            tags.extend(self.character.iter().cloned());
        }
        tags
    }
}

/// Controls which categories end up in a written sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidecarOptions {
    /// Prepend the highest-scoring rating label
    pub include_rating: bool,
    /// Drop character tags
    pub exclude_character: bool,
}

impl From<&crate::config::TaggingConfig> for SidecarOptions {
    fn from(config: &crate::config::TaggingConfig) -> Self {
        Self {
            include_rating: config.include_rating,
            exclude_character: config.exclude_character,
        }
    }
}

/// Result of processing one file in a bulk run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// Just the filename portion
    pub file_name: String,

    /// Full path to the source image
    pub path: PathBuf,

    /// Whether the image was classified and its sidecar written
    pub success: bool,

    /// Error message when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkOutcome {
    pub fn succeeded(path: PathBuf) -> Self {
        Self {
            file_name: file_name_of(&path),
            path,
            success: true,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name_of(&path),
            path,
            success: false,
            error: Some(error.into()),
        }
    }
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Aggregate counts for a bulk run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSummary {
    /// Images tagged successfully
    pub succeeded: usize,

    /// Images that failed
    pub failed: usize,

    /// `(file_name, message)` for every failure, in processing order
    pub failures: Vec<(String, String)>,
}

impl BulkSummary {
    pub fn from_outcomes(outcomes: &[BulkOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            if outcome.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                summary.failures.push((
                    outcome.file_name.clone(),
                    outcome.error.clone().unwrap_or_default(),
                ));
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> PredictionResult {
        PredictionResult {
            general: vec!["smile".into(), "solo".into()],
            rating: CategoryScores::new(vec![
                Tag::new("general", 0.7),
                Tag::new("sensitive", 0.2),
                Tag::new("questionable", 0.05),
                Tag::new("explicit", 0.01),
            ]),
            character: vec!["hatsune miku".into()],
            general_scores: CategoryScores::new(vec![Tag::new("solo", 0.6), Tag::new("smile", 0.9)]),
            character_scores: CategoryScores::new(vec![Tag::new("hatsune miku", 0.95)]),
            general_threshold: 0.35,
            character_threshold: 0.85,
        }
    }

    #[test]
    fn test_ranked_names_keeps_vocabulary_order_on_ties() {
        let scores = CategoryScores::new(vec![
            Tag::new("a", 0.5),
            Tag::new("b", 0.5),
            Tag::new("c", 0.9),
        ]);
        assert_eq!(scores.ranked_names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_category_scores_lookup() {
        let result = sample_result();
        assert_eq!(result.general_scores.get("smile"), Some(0.9));
        assert!(!result.general_scores.contains("missing"));
        assert_eq!(result.rating.top().unwrap().name, "general");
    }

    #[test]
    fn test_top_prefers_first_on_tie() {
        let scores = CategoryScores::new(vec![Tag::new("x", 0.4), Tag::new("y", 0.4)]);
        assert_eq!(scores.top().unwrap().name, "x");
        assert!(CategoryScores::default().top().is_none());
    }

    #[test]
    fn test_combined_tags_general_then_character() {
        let result = sample_result();
        assert_eq!(
            result.combined_tags(),
            vec!["smile", "solo", "hatsune miku"]
        );
    }

    #[test]
    fn test_sidecar_tags_options() {
        let result = sample_result();
        assert_eq!(
            result.sidecar_tags(&SidecarOptions::default()),
            result.combined_tags()
        );

        let tags = result.sidecar_tags(&SidecarOptions {
            include_rating: true,
            exclude_character: true,
        });
        assert_eq!(tags, vec!["general", "smile", "solo"]);
    }

    #[test]
    fn test_category_scores_serialize_as_list() {
        let scores = CategoryScores::new(vec![Tag::new("solo", 0.5)]);
        let json = serde_json::to_string(&scores).unwrap();
        assert_eq!(json, r#"[{"name":"solo","confidence":0.5}]"#);
    }

    #[test]
    fn test_bulk_summary_counts() {
        let outcomes = vec![
            BulkOutcome::succeeded(PathBuf::from("/d/a.png")),
            BulkOutcome::failed(PathBuf::from("/d/b.png"), "broken"),
            BulkOutcome::succeeded(PathBuf::from("/d/c.png")),
        ];
        let summary = BulkSummary::from_outcomes(&outcomes);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(
            summary.failures,
            vec![("b.png".to_string(), "broken".to_string())]
        );
    }

    #[test]
    fn test_bulk_outcome_skips_none_error() {
        let json = serde_json::to_string(&BulkOutcome::succeeded(PathBuf::from("a.jpg"))).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains("\"file_name\":\"a.jpg\""));
    }
}
