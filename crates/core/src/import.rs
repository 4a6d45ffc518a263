//! Import merge: folds a batch of raw rows into the bank, deduplicating by
//! content fingerprint.

use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

use crate::model::{Question, QuestionError, QuestionId, QuestionKind, parse_index_list};

/// One raw row from an import source, keyed by the CSV header names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub category: Option<String>,
    pub stem: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub kind: Option<String>,
    pub correct_indices: Option<String>,
    pub correct_index: Option<String>,
    pub rationale: Option<String>,
}

/// Why a row was not turned into a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingCategory,
    MissingStem,
    /// Zero-based option slot (`0` is `optionA`).
    MissingOption(usize),
    MissingAnswerKey,
    /// The answer key names no option that exists.
    UnusableAnswerKey(String),
    Invalid(QuestionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based position in the batch.
    pub row: usize,
    pub reason: SkipReason,
}

/// Counts reported back to the user after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    /// Size of the resulting bank.
    pub total: usize,
    pub skipped_rows: Vec<SkippedRow>,
}

/// Result of [`merge`]: the appended bank plus its report.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub bank: Vec<Question>,
    pub report: ImportReport,
}

/// Trim, strip one leading and one trailing `"`, lower-case, collapse
/// whitespace runs.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
    let lowered = unquoted.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Content identity of a question: category, stem and options only.
#[must_use]
pub fn fingerprint<S: AsRef<str>>(category: &str, stem: &str, options: &[S]) -> String {
    let options = options
        .iter()
        .map(|o| normalize(o.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    format!("{}||{}||{}", normalize(category), normalize(stem), options)
}

fn question_fingerprint(question: &Question) -> String {
    fingerprint(question.category(), question.stem(), question.options())
}

fn present(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Normalize a row into a question with a fresh id, or explain why not.
///
/// # Errors
///
/// Returns the `SkipReason` for the first missing or unusable field.
pub fn draft_question(row: &ImportRow) -> Result<Question, SkipReason> {
    let category = present(row.category.as_ref()).ok_or(SkipReason::MissingCategory)?;
    let stem = present(row.stem.as_ref()).ok_or(SkipReason::MissingStem)?;

    let slots = [&row.option_a, &row.option_b, &row.option_c, &row.option_d];
    let mut options = Vec::with_capacity(slots.len());
    for (slot, value) in slots.iter().enumerate() {
        let value = present(value.as_ref()).ok_or(SkipReason::MissingOption(slot))?;
        options.push(value.trim().to_owned());
    }

    let key = present(row.correct_indices.as_ref())
        .or_else(|| present(row.correct_index.as_ref()))
        .ok_or(SkipReason::MissingAnswerKey)?;
    let correct: BTreeSet<usize> = parse_index_list(key)
        .into_iter()
        .filter(|&i| i < options.len())
        .collect();
    if correct.is_empty() {
        return Err(SkipReason::UnusableAnswerKey(key.to_owned()));
    }

    let kind = row
        .kind
        .as_deref()
        .map_or(QuestionKind::Single, QuestionKind::parse_lenient);

    Question::new(
        QuestionId::generate(),
        category.trim(),
        stem.trim(),
        options,
        kind,
        correct,
        row.rationale.as_deref().unwrap_or_default().trim(),
    )
    .map_err(SkipReason::Invalid)
}

/// Append the rows to `existing`, first-seen fingerprint wins.
///
/// Rows are checked in order against the existing bank and against rows
/// accepted earlier in the same batch.
#[must_use]
pub fn merge<I>(existing: &[Question], rows: I) -> ImportOutcome
where
    I: IntoIterator<Item = ImportRow>,
{
    let mut seen: HashSet<String> = existing.iter().map(question_fingerprint).collect();
    let mut bank = existing.to_vec();
    let mut report = ImportReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        let question = match draft_question(&row) {
            Ok(question) => question,
            Err(reason) => {
                report.skipped += 1;
                report.skipped_rows.push(SkippedRow { row: index, reason });
                continue;
            }
        };

        if !seen.insert(question_fingerprint(&question)) {
            report.duplicates += 1;
            continue;
        }

        bank.push(question);
        report.inserted += 1;
    }

    report.total = bank.len();
    ImportOutcome { bank, report }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, stem: &str, kind: &str, correct: &str) -> ImportRow {
        ImportRow {
            category: Some(category.into()),
            stem: Some(stem.into()),
            option_a: Some("Alpha".into()),
            option_b: Some("Beta".into()),
            option_c: Some("Gamma".into()),
            option_d: Some("Delta".into()),
            kind: Some(kind.into()),
            correct_indices: Some(correct.into()),
            correct_index: None,
            rationale: Some("why".into()),
        }
    }

    #[test]
    fn normalize_matches_fingerprint_rules() {
        assert_eq!(normalize("  \"Hello   World\"  "), "hello world");
        assert_eq!(normalize("a\t\nb"), "a b");
        assert_eq!(normalize("\"\"x\"\""), "\"x\"");
    }

    #[test]
    fn reimport_is_idempotent() {
        let rows = vec![row("Cardio", "Q1", "single", "0"), row("Cardio", "Q2", "sata", "0,2")];
        let first = merge(&[], rows.clone());
        assert_eq!(first.report.inserted, 2);

        let second = merge(&first.bank, rows);
        assert_eq!(second.report.inserted, 0);
        assert_eq!(second.report.duplicates, 2);
        assert_eq!(second.report.total, 2);
        assert_eq!(second.bank, first.bank);
    }

    #[test]
    fn kind_and_answer_key_do_not_affect_identity() {
        let rows = vec![
            row("Cardio", "Same stem", "single", "1"),
            row(" cardio ", "\"same   STEM\"", "sata", "0,3"),
        ];
        let outcome = merge(&[], rows);
        assert_eq!(outcome.report.inserted, 1);
        assert_eq!(outcome.report.duplicates, 1);
        assert_eq!(outcome.bank[0].kind(), QuestionKind::Single);
    }

    #[test]
    fn skips_rows_with_missing_fields() {
        let mut no_stem = row("Cardio", "", "single", "0");
        no_stem.stem = None;
        let mut no_option = row("Cardio", "Q", "single", "0");
        no_option.option_c = Some("   ".into());
        let mut no_key = row("Cardio", "Q3", "single", "");
        no_key.correct_indices = None;

        let outcome = merge(&[], vec![no_stem, no_option, no_key]);
        assert_eq!(outcome.report.skipped, 3);
        assert_eq!(outcome.report.total, 0);
        assert_eq!(outcome.report.skipped_rows[0].reason, SkipReason::MissingStem);
        assert_eq!(outcome.report.skipped_rows[1].reason, SkipReason::MissingOption(2));
        assert_eq!(outcome.report.skipped_rows[2].reason, SkipReason::MissingAnswerKey);
    }

    #[test]
    fn falls_back_to_correct_index_and_defaults_kind() {
        let mut r = row("Pharm", "Dose?", "", "");
        r.kind = None;
        r.correct_indices = None;
        r.correct_index = Some("2".into());

        let outcome = merge(&[], vec![r]);
        let q = &outcome.bank[0];
        assert_eq!(q.kind(), QuestionKind::Single);
        assert_eq!(q.correct_indices(), &BTreeSet::from([2]));
    }

    #[test]
    fn answer_key_outside_options_is_skipped() {
        let outcome = merge(&[], vec![row("Pharm", "Dose?", "single", "7")]);
        assert_eq!(outcome.report.skipped, 1);
        assert!(matches!(
            outcome.report.skipped_rows[0].reason,
            SkipReason::UnusableAnswerKey(_)
        ));
    }

    #[test]
    fn rows_deserialize_from_csv_header_names() {
        let json = r#"{
            "category": "Neuro", "stem": "S", "optionA": "a", "optionB": "b",
            "optionC": "c", "optionD": "d", "correctIndex": "0"
        }"#;
        let parsed: ImportRow = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.option_d.as_deref(), Some("d"));
        assert_eq!(parsed.correct_index.as_deref(), Some("0"));
        assert!(draft_question(&parsed).is_ok());
    }
}
