use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

use quiz_core::model::{
    Attempt, PracticeMode, Question, QuestionId, QuestionKind, SessionSetup, missed_question_ids,
};

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    /// Number of bank questions that passed the filters.
    pub pool_size: usize,
}

impl SessionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds a practice pool from the bank, the attempt history and setup criteria.
pub struct PoolBuilder<'a> {
    bank: &'a [Question],
    attempts: &'a [Attempt],
}

impl<'a> PoolBuilder<'a> {
    #[must_use]
    pub fn new(bank: &'a [Question], attempts: &'a [Attempt]) -> Self {
        Self { bank, attempts }
    }

    /// Bank questions matching category, keyword, SATA-only and, in
    /// missed-only mode, an incorrect latest attempt. Bank order is kept.
    #[must_use]
    pub fn filter(&self, setup: &SessionSetup) -> Vec<Question> {
        let keyword = setup.keyword().trim().to_lowercase();
        let missed: Option<BTreeSet<QuestionId>> = match setup.mode() {
            PracticeMode::All => None,
            PracticeMode::MissedOnly => Some(missed_question_ids(self.attempts)),
        };

        self.bank
            .iter()
            .filter(|q| setup.category().matches(q.category()))
            .filter(|q| keyword.is_empty() || q.stem().to_lowercase().contains(&keyword))
            .filter(|q| !setup.sata_only() || q.kind() == QuestionKind::Multi)
            .filter(|q| missed.as_ref().is_none_or(|ids| ids.contains(q.id())))
            .cloned()
            .collect()
    }

    /// Filter, shuffle uniformly, then keep `max(1, min(count, pool))` questions.
    pub fn build_with_rng<R: Rng + ?Sized>(&self, setup: &SessionSetup, rng: &mut R) -> SessionPlan {
        let mut questions = self.filter(setup);
        let pool_size = questions.len();
        questions.as_mut_slice().shuffle(rng);

        let requested = usize::try_from(setup.count()).unwrap_or(usize::MAX);
        questions.truncate(requested.min(pool_size).max(1));

        SessionPlan {
            questions,
            pool_size,
        }
    }

    /// Same as [`Self::build_with_rng`] using the thread-local generator.
    #[must_use]
    pub fn build(&self, setup: &SessionSetup) -> SessionPlan {
        self.build_with_rng(setup, &mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptId, CategoryFilter};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_question(id: &str, category: &str, stem: &str, kind: QuestionKind) -> Question {
        Question::new(
            QuestionId::new(id),
            category,
            stem,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            kind,
            BTreeSet::from([0]),
            "",
        )
        .unwrap()
    }

    fn build_attempt(qid: &str, correct: bool, at: i64) -> Attempt {
        Attempt {
            id: AttemptId::generate(),
            question_id: QuestionId::new(qid),
            category: "Cardio".into(),
            selected: vec![1],
            is_correct: correct,
            attempted_at: at,
        }
    }

    fn bank() -> Vec<Question> {
        vec![
            build_question("q1", "Cardio", "Heart failure signs", QuestionKind::Single),
            build_question("q2", "Cardio", "Select all ECG findings", QuestionKind::Multi),
            build_question("q3", "Pharm", "Digoxin toxicity", QuestionKind::Single),
            build_question("q4", "Pharm", "Heparin antidote", QuestionKind::Multi),
        ]
    }

    fn ids(questions: &[Question]) -> Vec<&str> {
        questions.iter().map(|q| q.id().as_str()).collect()
    }

    #[test]
    fn filters_by_category_keyword_and_kind() {
        let bank = bank();
        let builder = PoolBuilder::new(&bank, &[]);

        let cardio = SessionSetup::default().with_category(CategoryFilter::parse("Cardio"));
        assert_eq!(ids(&builder.filter(&cardio)), vec!["q1", "q2"]);

        let keyword = SessionSetup::default().with_keyword("HEART");
        assert_eq!(ids(&builder.filter(&keyword)), vec!["q1"]);

        let sata = SessionSetup::default().with_sata_only(true);
        assert_eq!(ids(&builder.filter(&sata)), vec!["q2", "q4"]);
    }

    #[test]
    fn missed_mode_uses_latest_attempt_only() {
        let bank = bank();
        let attempts = vec![
            build_attempt("q1", true, 30),
            build_attempt("q3", false, 20),
            build_attempt("q1", false, 10),
        ];
        let builder = PoolBuilder::new(&bank, &attempts);
        let setup = SessionSetup::default().with_mode(PracticeMode::MissedOnly);
        assert_eq!(ids(&builder.filter(&setup)), vec!["q3"]);
    }

    #[test]
    fn unattempted_questions_are_never_missed() {
        let bank = bank();
        let builder = PoolBuilder::new(&bank, &[]);
        let setup = SessionSetup::default().with_mode(PracticeMode::MissedOnly);
        assert!(builder.filter(&setup).is_empty());
    }

    #[test]
    fn pool_size_is_min_of_count_and_filtered() {
        let bank = bank();
        let builder = PoolBuilder::new(&bank, &[]);
        let mut rng = StdRng::seed_from_u64(7);

        for count in 1..=6 {
            let setup = SessionSetup::default().with_count(count).unwrap();
            let plan = builder.build_with_rng(&setup, &mut rng);
            assert_eq!(plan.total(), (count as usize).min(4));
            assert_eq!(plan.pool_size, 4);
        }
    }

    #[test]
    fn empty_filter_yields_empty_plan() {
        let bank = bank();
        let builder = PoolBuilder::new(&bank, &[]);
        let setup = SessionSetup::default().with_keyword("no such stem");
        let plan = builder.build(&setup);
        assert!(plan.is_empty());
        assert_eq!(plan.pool_size, 0);
    }

    #[test]
    fn shuffle_keeps_every_selected_question_distinct() {
        let bank = bank();
        let builder = PoolBuilder::new(&bank, &[]);
        let plan = builder.build_with_rng(&SessionSetup::default(), &mut StdRng::seed_from_u64(1));
        let unique: BTreeSet<_> = plan.questions.iter().map(Question::id).collect();
        assert_eq!(unique.len(), 4);
    }
}
