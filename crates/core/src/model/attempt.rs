use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::model::ids::{AttemptId, QuestionId};
use crate::model::question::Question;

/// Record of a single submitted answer. Append-only.
///
/// `question_id` is a weak reference: the question may have been removed by a
/// later bank reset, so consumers must tolerate a dangling id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub question_id: QuestionId,
    /// Category of the question at attempt time.
    #[serde(default)]
    pub category: String,
    /// Selected option indices, ascending and deduplicated.
    #[serde(default)]
    pub selected: Vec<usize>,
    #[serde(default)]
    pub is_correct: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub attempted_at: i64,
}

impl Attempt {
    /// Grade `selection` against `question` and record the result.
    #[must_use]
    pub fn grade(question: &Question, selection: &BTreeSet<usize>, attempted_at: i64) -> Self {
        Self {
            id: AttemptId::generate(),
            question_id: question.id().clone(),
            category: question.category().to_owned(),
            selected: selection.iter().copied().collect(),
            is_correct: question.is_correct_selection(selection),
            attempted_at,
        }
    }
}

/// Latest attempt per question id.
///
/// Sorts by `attempted_at` descending instead of trusting container order;
/// among equal timestamps the attempt that appears first wins, matching the
/// newest-first history layout.
#[must_use]
pub fn latest_attempts(attempts: &[Attempt]) -> HashMap<&QuestionId, &Attempt> {
    let mut sorted: Vec<&Attempt> = attempts.iter().collect();
    sorted.sort_by_key(|a| Reverse(a.attempted_at));

    let mut latest = HashMap::new();
    for attempt in sorted {
        latest.entry(&attempt.question_id).or_insert(attempt);
    }
    latest
}

/// Question ids whose latest attempt was incorrect.
#[must_use]
pub fn missed_question_ids(attempts: &[Attempt]) -> BTreeSet<QuestionId> {
    latest_attempts(attempts)
        .into_iter()
        .filter(|(_, attempt)| !attempt.is_correct)
        .map(|(id, _)| id.clone())
        .collect()
}
