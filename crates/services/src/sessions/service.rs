use std::collections::BTreeSet;
use std::fmt;

use quiz_core::model::{Attempt, Question, QuestionId, QuestionKind};

use super::progress::SessionProgress;

/// Where a run currently is in its question loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for a selection and `submit`.
    Running,
    /// Current question graded; waiting for `advance`.
    Submitted,
    /// Past the last question (or started with an empty pool).
    Completed,
}

//
// ─── PRACTICE SESSION ──────────────────────────────────────────────────────────
//

/// One scored run over a fixed pool of questions.
///
/// The run never mutates questions; it only produces `Attempt` records that
/// the caller appends to the history.
pub struct PracticeSession {
    pool: Vec<Question>,
    cursor: usize,
    selection: BTreeSet<usize>,
    phase: SessionPhase,
    session_correct: usize,
    session_total: usize,
    answered: usize,
    missed_ids: BTreeSet<QuestionId>,
    last_correct: Option<bool>,
    last_attempted_at: Option<i64>,
}

impl PracticeSession {
    /// Start a run over `pool`. An empty pool starts already completed with a
    /// zero total.
    #[must_use]
    pub fn new(pool: Vec<Question>) -> Self {
        let mut session = Self {
            pool,
            cursor: 0,
            selection: BTreeSet::new(),
            phase: SessionPhase::Running,
            session_correct: 0,
            session_total: 0,
            answered: 0,
            missed_ids: BTreeSet::new(),
            last_correct: None,
            last_attempted_at: None,
        };
        session.reset_run();
        session
    }

    fn reset_run(&mut self) {
        self.cursor = 0;
        self.selection.clear();
        self.session_correct = 0;
        self.answered = 0;
        self.missed_ids.clear();
        self.last_correct = None;
        self.session_total = self.pool.len();
        self.phase = if self.pool.is_empty() {
            SessionPhase::Completed
        } else {
            SessionPhase::Running
        };
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    #[must_use]
    pub fn session_correct(&self) -> usize {
        self.session_correct
    }

    #[must_use]
    pub fn session_total(&self) -> usize {
        self.session_total
    }

    #[must_use]
    pub fn missed_ids(&self) -> &BTreeSet<QuestionId> {
        &self.missed_ids
    }

    /// Grading of the current question, available while `Submitted`.
    #[must_use]
    pub fn last_correct(&self) -> Option<bool> {
        self.last_correct
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.pool.get(self.cursor)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let position = if self.is_complete() {
            self.session_total
        } else {
            self.cursor + 1
        };
        SessionProgress {
            position,
            total: self.session_total,
            answered: self.answered,
            correct: self.session_correct,
            is_complete: self.is_complete(),
        }
    }

    /// Radio semantics for single-answer questions, checkbox semantics for
    /// SATA. Ignored unless `Running` or when `index` is not an option.
    pub fn toggle_selection(&mut self, index: usize) {
        if self.phase != SessionPhase::Running {
            return;
        }
        let Some(question) = self.pool.get(self.cursor) else {
            return;
        };
        if index >= question.options().len() {
            return;
        }

        match question.kind() {
            QuestionKind::Single => {
                self.selection.clear();
                self.selection.insert(index);
            }
            QuestionKind::Multi => {
                if !self.selection.remove(&index) {
                    self.selection.insert(index);
                }
            }
        }
    }

    /// Grade the current selection and move to `Submitted`.
    ///
    /// Returns the attempt to append to the history, or `None` when not
    /// `Running` or nothing is selected. `attempted_at` is clamped so it
    /// never decreases within the run.
    pub fn submit(&mut self, attempted_at: i64) -> Option<Attempt> {
        if self.phase != SessionPhase::Running || self.selection.is_empty() {
            return None;
        }
        let question = self.pool.get(self.cursor)?;

        let attempted_at = self
            .last_attempted_at
            .map_or(attempted_at, |last| last.max(attempted_at));
        let attempt = Attempt::grade(question, &self.selection, attempted_at);

        if attempt.is_correct {
            self.session_correct += 1;
        } else {
            self.missed_ids.insert(question.id().clone());
        }
        self.answered += 1;
        self.last_correct = Some(attempt.is_correct);
        self.last_attempted_at = Some(attempted_at);
        self.phase = SessionPhase::Submitted;

        Some(attempt)
    }

    /// Move past a submitted question, completing the run after the last one.
    pub fn advance(&mut self) {
        if self.phase != SessionPhase::Submitted {
            return;
        }
        self.selection.clear();
        self.last_correct = None;

        if self.cursor + 1 >= self.pool.len() {
            self.phase = SessionPhase::Completed;
        } else {
            self.cursor += 1;
            self.phase = SessionPhase::Running;
        }
    }

    /// Replay the identical pool from the start with fresh scoring.
    pub fn restart(&mut self) {
        self.reset_run();
    }

    /// Narrow the pool to the questions missed in this run and replay them.
    ///
    /// Returns `false` (and changes nothing) when nothing was missed.
    pub fn retry_missed(&mut self) -> bool {
        if self.missed_ids.is_empty() {
            return false;
        }
        let missed = std::mem::take(&mut self.missed_ids);
        self.pool.retain(|q| missed.contains(q.id()));
        self.reset_run();
        true
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("pool_len", &self.pool.len())
            .field("cursor", &self.cursor)
            .field("phase", &self.phase)
            .field("session_correct", &self.session_correct)
            .field("session_total", &self.session_total)
            .field("missed", &self.missed_ids.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn build_question(id: &str, kind: QuestionKind, correct: &[usize]) -> Question {
        Question::new(
            QuestionId::new(id),
            "Cardio",
            format!("Stem {id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            kind,
            correct.iter().copied().collect(),
            "",
        )
        .unwrap()
    }

    fn answer(session: &mut PracticeSession, picks: &[usize], at: i64) -> Attempt {
        for &pick in picks {
            session.toggle_selection(pick);
        }
        session.submit(at).expect("submitted")
    }

    #[test]
    fn empty_pool_starts_completed() {
        let session = PracticeSession::new(Vec::new());
        assert!(session.is_complete());
        assert_eq!(session.session_total(), 0);
        assert!(session.current_question().is_none());
    }

    #[test]
    fn single_kind_replaces_selection() {
        let mut session = PracticeSession::new(vec![build_question("q1", QuestionKind::Single, &[1])]);
        session.toggle_selection(0);
        session.toggle_selection(2);
        assert_eq!(session.selection(), &BTreeSet::from([2]));
    }

    #[test]
    fn multi_kind_toggles_membership() {
        let mut session = PracticeSession::new(vec![build_question("q1", QuestionKind::Multi, &[0, 2])]);
        session.toggle_selection(0);
        session.toggle_selection(1);
        session.toggle_selection(1);
        session.toggle_selection(9);
        assert_eq!(session.selection(), &BTreeSet::from([0]));
    }

    #[test]
    fn submit_requires_a_selection_and_grades_exact_set() {
        let mut session = PracticeSession::new(vec![
            build_question("q1", QuestionKind::Multi, &[0, 2]),
            build_question("q2", QuestionKind::Multi, &[0, 2]),
        ]);
        assert!(session.submit(1).is_none());

        let first = answer(&mut session, &[2, 0], 1);
        assert!(first.is_correct);
        assert_eq!(first.selected, vec![0, 2]);
        assert_eq!(session.phase(), SessionPhase::Submitted);

        // selection is frozen once submitted
        session.toggle_selection(1);
        assert_eq!(session.selection(), &BTreeSet::from([0, 2]));

        session.advance();
        let second = answer(&mut session, &[0, 1, 2], 2);
        assert!(!second.is_correct);
        assert_eq!(session.session_correct(), 1);
        assert_eq!(session.missed_ids(), &BTreeSet::from([QuestionId::new("q2")]));
    }

    #[test]
    fn advance_completes_after_last_question() {
        let mut session = PracticeSession::new(vec![build_question("q1", QuestionKind::Single, &[0])]);
        session.advance();
        assert_eq!(session.phase(), SessionPhase::Running);

        answer(&mut session, &[0], 5);
        session.advance();
        assert!(session.is_complete());
        assert_eq!(session.progress().position, 1);
        assert_eq!(session.progress().correct, 1);
    }

    #[test]
    fn timestamps_never_decrease_within_a_run() {
        let mut session = PracticeSession::new(vec![
            build_question("q1", QuestionKind::Single, &[0]),
            build_question("q2", QuestionKind::Single, &[0]),
        ]);
        let first = answer(&mut session, &[0], 100);
        session.advance();
        let second = answer(&mut session, &[0], 50);
        assert_eq!(first.attempted_at, 100);
        assert_eq!(second.attempted_at, 100);
    }

    #[test]
    fn restart_keeps_pool_and_resets_scoring() {
        let mut session = PracticeSession::new(vec![
            build_question("q1", QuestionKind::Single, &[0]),
            build_question("q2", QuestionKind::Single, &[0]),
        ]);
        answer(&mut session, &[1], 1);
        session.advance();
        answer(&mut session, &[0], 2);
        session.advance();
        assert!(session.is_complete());

        let before: Vec<_> = session.pool().iter().map(|q| q.id().clone()).collect();
        session.restart();
        let after: Vec<_> = session.pool().iter().map(|q| q.id().clone()).collect();
        assert_eq!(before, after);
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.session_correct(), 0);
        assert!(session.missed_ids().is_empty());
    }

    #[test]
    fn retry_missed_narrows_pool() {
        let mut session = PracticeSession::new(vec![
            build_question("q1", QuestionKind::Single, &[0]),
            build_question("q2", QuestionKind::Single, &[0]),
            build_question("q3", QuestionKind::Single, &[0]),
        ]);
        for (pick, at) in [(1, 1), (0, 2), (3, 3)] {
            answer(&mut session, &[pick], at);
            session.advance();
        }
        assert!(session.is_complete());
        assert_eq!(session.session_correct(), 1);

        assert!(session.retry_missed());
        let ids: Vec<_> = session.pool().iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
        assert_eq!(session.session_total(), 2);
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn retry_missed_is_noop_without_misses() {
        let mut session = PracticeSession::new(vec![build_question("q1", QuestionKind::Single, &[0])]);
        answer(&mut session, &[0], 1);
        session.advance();
        assert!(!session.retry_missed());
        assert!(session.is_complete());
        assert_eq!(session.pool().len(), 1);
    }
}
