use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct index {index} is outside the {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("a question needs at least one correct option")]
    NoCorrectOption,
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// Answer mode of a question.
///
/// `Single` behaves like a radio group, `Multi` ("select all that apply")
/// like a set of checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuestionKind {
    #[default]
    Single,
    Multi,
}

impl QuestionKind {
    /// Any trimmed, case-insensitive spelling other than `single` is the
    /// multi-select kind; blank input falls back to `Single`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() || normalized == "single" {
            Self::Single
        } else {
            Self::Multi
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multi => "sata",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QuestionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or(Self::Single, |s| Self::parse_lenient(&s)))
    }
}

//
// ─── CORRECT INDICES ──────────────────────────────────────────────────────────
//

/// Parses a comma-separated list of zero-based option indices (`"0, 2"`).
///
/// Entries that are not non-negative integers are ignored.
#[must_use]
pub fn parse_index_list(raw: &str) -> BTreeSet<usize> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIndices {
    List(Vec<i64>),
    Text(String),
    One(i64),
}

fn deserialize_indices<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<usize>, D::Error> {
    let raw = Option::<RawIndices>::deserialize(deserializer)?;
    Ok(match raw {
        None => BTreeSet::new(),
        Some(RawIndices::Text(text)) => parse_index_list(&text),
        Some(RawIndices::One(n)) => usize::try_from(n).into_iter().collect(),
        Some(RawIndices::List(list)) => list
            .into_iter()
            .filter_map(|n| usize::try_from(n).ok())
            .collect(),
    })
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A bank entry. Immutable once imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    #[serde(default)]
    category: String,
    #[serde(default)]
    stem: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    kind: QuestionKind,
    #[serde(default, deserialize_with = "deserialize_indices")]
    correct_indices: BTreeSet<usize>,
    #[serde(default)]
    rationale: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if there are fewer than two options, the
    /// correct set is empty, or a correct index does not address an option.
    pub fn new(
        id: QuestionId,
        category: impl Into<String>,
        stem: impl Into<String>,
        options: Vec<String>,
        kind: QuestionKind,
        correct_indices: BTreeSet<usize>,
        rationale: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if correct_indices.is_empty() {
            return Err(QuestionError::NoCorrectOption);
        }
        if let Some(&index) = correct_indices.iter().find(|&&i| i >= options.len()) {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            category: category.into(),
            stem: stem.into(),
            options,
            kind,
            correct_indices,
            rationale: rationale.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn correct_indices(&self) -> &BTreeSet<usize> {
        &self.correct_indices
    }

    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Exact set equality between the selection and the answer key.
    #[must_use]
    pub fn is_correct_selection(&self, selection: &BTreeSet<usize>) -> bool {
        selection.len() == self.correct_indices.len()
            && selection.is_subset(&self.correct_indices)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
