use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::attempt::Attempt;
use crate::model::question::Question;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot document is not an object")]
    NotAnObject,

    #[error("snapshot field `{0}` is missing or not a sequence")]
    MissingField(&'static str),
}

/// The full `{questions, attempts}` pair: unit of local persistence and of
/// remote replication.
///
/// `attempts` is kept newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub questions: Vec<Question>,
    pub attempts: Vec<Attempt>,
}

impl StateSnapshot {
    #[must_use]
    pub fn new(questions: Vec<Question>, attempts: Vec<Attempt>) -> Self {
        Self {
            questions,
            attempts,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.attempts.is_empty()
    }

    /// Decode a locally persisted document.
    ///
    /// A field that is absent or not an array decodes as empty while the other
    /// field is kept.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` when the text is not JSON, is not an object, or
    /// an array contains entries that cannot be decoded.
    pub fn from_json_lenient(raw: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut map) = value else {
            return Err(SnapshotError::NotAnObject);
        };

        Ok(Self {
            questions: lenient_field(map.remove("questions"))?,
            attempts: lenient_field(map.remove("attempts"))?,
        })
    }

    /// Decode a remote document, requiring both sequences to be present.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::MissingField` if either sequence is absent or
    /// not an array, or `SnapshotError::Json` if entries fail to decode.
    pub fn from_value_strict(value: Value) -> Result<Self, SnapshotError> {
        let Value::Object(mut map) = value else {
            return Err(SnapshotError::NotAnObject);
        };
        let questions = strict_field(map.remove("questions"), "questions")?;
        let attempts = strict_field(map.remove("attempts"), "attempts")?;
        Ok(Self {
            questions,
            attempts,
        })
    }

    /// Serialize to the persisted JSON document.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn lenient_field<T: DeserializeOwned>(value: Option<Value>) -> Result<Vec<T>, SnapshotError> {
    match value {
        Some(array @ Value::Array(_)) => Ok(serde_json::from_value(array)?),
        _ => Ok(Vec::new()),
    }
}

fn strict_field<T: DeserializeOwned>(
    value: Option<Value>,
    name: &'static str,
) -> Result<Vec<T>, SnapshotError> {
    match value {
        Some(array @ Value::Array(_)) => Ok(serde_json::from_value(array)?),
        _ => Err(SnapshotError::MissingField(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_decode_keeps_valid_field() {
        let raw = r#"{"questions": "oops", "attempts": [
            {"id": "a1", "questionId": "q1", "isCorrect": true, "attemptedAt": 5}
        ]}"#;
        let snapshot = StateSnapshot::from_json_lenient(raw).unwrap();
        assert!(snapshot.questions.is_empty());
        assert_eq!(snapshot.attempts.len(), 1);
    }

    #[test]
    fn lenient_decode_rejects_garbage() {
        assert!(StateSnapshot::from_json_lenient("{not json").is_err());
        assert!(matches!(
            StateSnapshot::from_json_lenient("[1, 2]"),
            Err(SnapshotError::NotAnObject)
        ));
    }

    #[test]
    fn strict_decode_requires_both_sequences() {
        let err = StateSnapshot::from_value_strict(json!({"questions": []})).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingField("attempts")));

        let ok = StateSnapshot::from_value_strict(json!({"questions": [], "attempts": []}));
        assert!(ok.unwrap().is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let snapshot = StateSnapshot::default();
        let text = snapshot.to_json().unwrap();
        assert_eq!(text, r#"{"questions":[],"attempts":[]}"#);
    }
}
