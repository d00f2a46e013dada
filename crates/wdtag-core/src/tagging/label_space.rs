//! Label vocabulary loading.
//!
//! WD tagger models ship a `selected_tags.csv` whose row order matches the
//! model's output vector. Each row carries a `name` and an integer
//! `category` code; the codes we care about are 9 (rating), 0 (general) and
//! 4 (character). Anything else is kept for index alignment but never reported.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Category of a vocabulary label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    /// Content rating (general / sensitive / questionable / explicit). Code 9.
    Rating,
    /// Descriptive attribute: pose, clothing, setting. Code 0.
    General,
    /// Named character identity. Code 4.
    Character,
    /// Any other code (artist, copyright, meta). Ignored by the classifier.
    Other,
}

impl TagCategory {
    pub const RATING_CODE: i64 = 9;
    pub const GENERAL_CODE: i64 = 0;
    pub const CHARACTER_CODE: i64 = 4;

    /// Map a vocabulary category code to a category.
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::RATING_CODE => Self::Rating,
            Self::GENERAL_CODE => Self::General,
            Self::CHARACTER_CODE => Self::Character,
            _ => Self::Other,
        }
    }
}

/// A single vocabulary row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    /// Position in the model output vector
    pub index: usize,
    /// Tag name as written to sidecars
    pub name: String,
    pub category: TagCategory,
}

/// The loaded vocabulary, partitioned by category.
///
/// Built once per model and shared read-only by every prediction.
#[derive(Debug, Clone)]
pub struct LabelSpace {
    entries: Vec<LabelEntry>,
    rating: Vec<usize>,
    general: Vec<usize>,
    character: Vec<usize>,
    other: Vec<usize>,
    fingerprint: String,
}

impl LabelSpace {
    /// Load the vocabulary from a CSV file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let labels = Self::from_bytes(&bytes)?;

        tracing::info!(
            "Loaded vocabulary from {:?}: {} labels ({} rating, {} general, {} character)",
            path,
            labels.len(),
            labels.rating.len(),
            labels.general.len(),
            labels.character.len(),
        );
        tracing::debug!("Vocabulary fingerprint: {}", labels.fingerprint);

        Ok(labels)
    }

    /// Parse the vocabulary from in-memory CSV bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut labels = Self::from_reader(bytes)?;
        labels.fingerprint = crate::hash::content_hash_from_bytes(bytes);
        Ok(labels)
    }

    /// Parse the vocabulary from any CSV reader.
    ///
    /// The fingerprint is left empty; use [`LabelSpace::from_bytes`] or
    /// [`LabelSpace::load`] when it is needed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let name_col = column(&headers, "name")?;
        let category_col = column(&headers, "category")?;

        let mut entries = Vec::new();
        for (index, record) in rdr.records().enumerate() {
            let record = record?;
            // Row numbers in messages are 1-based and skip the header.
            let row = index + 2;
            let name = record.get(name_col).ok_or_else(|| LoadError::InvalidRow {
                row,
                message: "missing name".to_string(),
            })?;
            let code = record
                .get(category_col)
                .ok_or_else(|| LoadError::InvalidRow {
                    row,
                    message: "missing category".to_string(),
                })?
                .parse::<i64>()
                .map_err(|e| LoadError::InvalidRow {
                    row,
                    message: format!("category is not an integer: {e}"),
                })?;

            entries.push(LabelEntry {
                index,
                name: name.to_string(),
                category: TagCategory::from_code(code),
            });
        }

        if entries.is_empty() {
            return Err(LoadError::Empty);
        }

        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<LabelEntry>) -> Self {
        let indexes_of = |category: TagCategory| -> Vec<usize> {
            entries
                .iter()
                .filter(|e| e.category == category)
                .map(|e| e.index)
                .collect()
        };

        Self {
            rating: indexes_of(TagCategory::Rating),
            general: indexes_of(TagCategory::General),
            character: indexes_of(TagCategory::Character),
            other: indexes_of(TagCategory::Other),
            entries,
            fingerprint: String::new(),
        }
    }

    /// Output positions belonging to a category, in vocabulary order.
    pub fn category_indexes(&self, category: TagCategory) -> &[usize] {
        match category {
            TagCategory::Rating => &self.rating,
            TagCategory::General => &self.general,
            TagCategory::Character => &self.character,
            TagCategory::Other => &self.other,
        }
    }

    /// All label names in vocabulary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.entries
    }

    /// Number of labels (and therefore the expected score vector length).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// BLAKE3 digest of the vocabulary file contents.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn column(headers: &csv::StringRecord, name: &'static str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or(LoadError::MissingColumn(name))
}
