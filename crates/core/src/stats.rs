//! Derived study statistics, recomputed on demand from a snapshot.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Question, StateSnapshot, latest_attempts};

/// Label used for attempts or questions without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAccuracy {
    pub category: String,
    pub total: usize,
    pub correct: usize,
    pub accuracy_pct: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyStats {
    pub total_attempts: usize,
    pub unique_attempted: usize,
    /// Questions whose latest attempt is correct.
    pub unique_mastered: usize,
    pub mastery_pct: u32,
    pub overall_accuracy_pct: u32,
    /// Weakest category first.
    pub weak_areas: Vec<CategoryAccuracy>,
    /// Questions per category, sorted by name.
    pub bank_counts: Vec<(String, usize)>,
}

/// `part / whole` as a percentage rounded half up; `0` for an empty whole.
#[must_use]
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 200 + whole) / (whole * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

fn category_label(category: &str) -> &str {
    if category.is_empty() {
        UNCATEGORIZED
    } else {
        category
    }
}

impl StudyStats {
    #[must_use]
    pub fn compute(snapshot: &StateSnapshot) -> Self {
        let attempts = &snapshot.attempts;
        let latest = latest_attempts(attempts);
        let unique_attempted = latest.len();
        let unique_mastered = latest.values().filter(|a| a.is_correct).count();
        let correct_total = attempts.iter().filter(|a| a.is_correct).count();

        let mut per_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for attempt in attempts {
            let entry = per_category
                .entry(category_label(&attempt.category))
                .or_default();
            entry.0 += 1;
            if attempt.is_correct {
                entry.1 += 1;
            }
        }
        let mut weak_areas: Vec<CategoryAccuracy> = per_category
            .into_iter()
            .map(|(category, (total, correct))| CategoryAccuracy {
                category: category.to_owned(),
                total,
                correct,
                accuracy_pct: percent(correct, total),
            })
            .collect();
        // stable: ties stay alphabetical
        weak_areas.sort_by_key(|row| row.accuracy_pct);

        Self {
            total_attempts: attempts.len(),
            unique_attempted,
            unique_mastered,
            mastery_pct: percent(unique_mastered, unique_attempted),
            overall_accuracy_pct: percent(correct_total, attempts.len()),
            weak_areas,
            bank_counts: bank_counts(&snapshot.questions),
        }
    }
}

/// Questions per category label, sorted by label.
#[must_use]
pub fn bank_counts(bank: &[Question]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for question in bank {
        *counts.entry(category_label(question.category())).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, n)| (category.to_owned(), n))
        .collect()
}

/// Distinct non-empty categories in the bank, sorted, for the setup screen.
#[must_use]
pub fn categories(bank: &[Question]) -> Vec<String> {
    bank.iter()
        .map(Question::category)
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}
