//! Canonical in-memory snapshot with local write-through and remote replication.

use log::debug;
use quiz_core::import::{self, ImportReport, ImportRow};
use quiz_core::model::{Attempt, StateSnapshot};
use quiz_core::stats::{self, StudyStats};
use storage::LocalSnapshotStore;

use crate::error::AppStateError;
use crate::sync::{Identity, ReconcileOutcome, SyncService};

/// Single writer of the `{questions, attempts}` snapshot.
///
/// Every mutation replaces the snapshot, writes it through to the local store
/// and, once the sync service has reconciled the current identity, schedules a
/// debounced remote push.
pub struct AppState {
    local: LocalSnapshotStore,
    sync: SyncService,
    snapshot: StateSnapshot,
}

impl AppState {
    /// Load the persisted snapshot once. Never fails; corrupt or missing data
    /// yields an empty snapshot.
    pub async fn hydrate(local: LocalSnapshotStore, sync: SyncService) -> Self {
        let snapshot = local.load().await;
        Self {
            local,
            sync,
            snapshot,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn sync(&self) -> &SyncService {
        &self.sync
    }

    /// Replace the snapshot and persist it.
    ///
    /// # Errors
    ///
    /// Returns `AppStateError::Storage` when the local write fails. The
    /// in-memory snapshot is replaced and the remote push scheduled regardless.
    pub async fn mutate(&mut self, next: StateSnapshot) -> Result<(), AppStateError> {
        self.snapshot = next;
        let written = self.local.save(&self.snapshot).await;
        self.sync.schedule_push(self.snapshot.clone());
        written?;
        debug!(
            "state persisted: {} questions, {} attempts",
            self.snapshot.questions.len(),
            self.snapshot.attempts.len()
        );
        Ok(())
    }

    /// Merge imported rows into the bank.
    ///
    /// The snapshot is only mutated when at least one question was inserted.
    ///
    /// # Errors
    ///
    /// Returns `AppStateError::Storage` when the local write fails.
    pub async fn import_rows<I>(&mut self, rows: I) -> Result<ImportReport, AppStateError>
    where
        I: IntoIterator<Item = ImportRow>,
    {
        let outcome = import::merge(&self.snapshot.questions, rows);
        if outcome.report.inserted > 0 {
            let next = StateSnapshot::new(outcome.bank, self.snapshot.attempts.clone());
            self.mutate(next).await?;
        }
        Ok(outcome.report)
    }

    /// Prepend `attempt` so the history stays newest-first.
    ///
    /// # Errors
    ///
    /// Returns `AppStateError::Storage` when the local write fails.
    pub async fn record_attempt(&mut self, attempt: Attempt) -> Result<(), AppStateError> {
        let mut attempts = Vec::with_capacity(self.snapshot.attempts.len() + 1);
        attempts.push(attempt);
        attempts.extend(self.snapshot.attempts.iter().cloned());
        let next = StateSnapshot::new(self.snapshot.questions.clone(), attempts);
        self.mutate(next).await
    }

    /// Clear the bank and the history.
    ///
    /// # Errors
    ///
    /// Returns `AppStateError::Storage` when the local write fails.
    pub async fn reset(&mut self) -> Result<(), AppStateError> {
        self.mutate(StateSnapshot::default()).await
    }

    /// Forward an identity change to the sync service.
    ///
    /// An adopted remote snapshot replaces local state and is persisted
    /// locally, but is not pushed back.
    ///
    /// # Errors
    ///
    /// Returns `AppStateError::Storage` when persisting an adopted snapshot fails.
    pub async fn set_identity(
        &mut self,
        identity: Option<&Identity>,
    ) -> Result<ReconcileOutcome, AppStateError> {
        let outcome = self.sync.set_identity(identity, &self.snapshot).await;
        if let ReconcileOutcome::AdoptedRemote(remote) = &outcome {
            self.snapshot = remote.clone();
            self.local.save(&self.snapshot).await?;
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn stats(&self) -> StudyStats {
        StudyStats::compute(&self.snapshot)
    }

    /// Distinct categories in the bank, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        stats::categories(&self.snapshot.questions)
    }

    /// Cancel a push still waiting for its quiet period.
    pub fn shutdown(&mut self) {
        self.sync.cancel_pending();
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("questions", &self.snapshot.questions.len())
            .field("attempts", &self.snapshot.attempts.len())
            .field("sync", self.sync.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId, QuestionKind};
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use storage::repository::{DocumentRepository, InMemoryRepository};

    fn row(stem: &str) -> ImportRow {
        ImportRow {
            category: Some("Cardio".into()),
            stem: Some(stem.into()),
            option_a: Some("A".into()),
            option_b: Some("B".into()),
            option_c: Some("C".into()),
            option_d: Some("D".into()),
            kind: Some("single".into()),
            correct_indices: Some("1".into()),
            ..ImportRow::default()
        }
    }

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            "Cardio",
            format!("Stem {id}"),
            vec!["A".into(), "B".into()],
            QuestionKind::Single,
            BTreeSet::from([0]),
            "",
        )
        .expect("valid question")
    }

    async fn state_over(repo: &InMemoryRepository) -> AppState {
        let documents: Arc<dyn DocumentRepository> = Arc::new(repo.clone());
        AppState::hydrate(LocalSnapshotStore::new(documents), SyncService::disabled()).await
    }

    #[tokio::test]
    async fn hydrate_starts_empty_without_document() {
        let repo = InMemoryRepository::new();
        let state = state_over(&repo).await;
        assert!(state.snapshot().is_empty());
    }

    #[tokio::test]
    async fn mutate_is_observed_by_next_hydrate() {
        let repo = InMemoryRepository::new();
        let mut state = state_over(&repo).await;
        state
            .mutate(StateSnapshot::new(vec![question("q1")], Vec::new()))
            .await
            .expect("mutate");

        let reloaded = state_over(&repo).await;
        assert_eq!(reloaded.snapshot(), state.snapshot());
    }

    #[tokio::test]
    async fn import_reports_counts_and_persists() {
        let repo = InMemoryRepository::new();
        let mut state = state_over(&repo).await;

        let report = state
            .import_rows(vec![row("First"), row("first "), row("Second")])
            .await
            .expect("import");
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.total, 2);

        let reloaded = state_over(&repo).await;
        assert_eq!(reloaded.snapshot().questions.len(), 2);
    }

    #[tokio::test]
    async fn record_attempt_prepends() {
        let repo = InMemoryRepository::new();
        let mut state = state_over(&repo).await;
        let q = question("q1");
        state
            .mutate(StateSnapshot::new(vec![q.clone()], Vec::new()))
            .await
            .expect("seed");

        let first = Attempt::grade(&q, &BTreeSet::from([1]), 1_000);
        let second = Attempt::grade(&q, &BTreeSet::from([0]), 2_000);
        state.record_attempt(first.clone()).await.expect("first");
        state.record_attempt(second.clone()).await.expect("second");

        assert_eq!(state.snapshot().attempts, vec![second, first]);
        assert_eq!(state.stats().unique_mastered, 1);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let repo = InMemoryRepository::new();
        let mut state = state_over(&repo).await;
        state.import_rows(vec![row("Only")]).await.expect("import");
        assert_eq!(state.categories(), vec!["Cardio".to_string()]);

        state.reset().await.expect("reset");
        assert!(state.snapshot().is_empty());
        assert!(state_over(&repo).await.snapshot().is_empty());
    }

    #[tokio::test]
    async fn disabled_sync_reports_disabled() {
        let repo = InMemoryRepository::new();
        let mut state = state_over(&repo).await;
        let identity = Identity::new(quiz_core::model::UserId::new("user-1"));
        let outcome = state.set_identity(Some(&identity)).await.expect("identity");
        assert!(matches!(outcome, ReconcileOutcome::Disabled));
    }
}
