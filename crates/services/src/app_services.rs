use std::sync::Arc;

use storage::repository::{DocumentRepository, InMemoryRepository, RemoteStateRepository, Storage};
use storage::LocalSnapshotStore;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::sessions::PracticeService;
use crate::sync::{RestStateStore, SyncService};
use crate::Clock;

/// Assembles the controller and the practice workflow over one storage backend.
#[derive(Debug)]
pub struct AppServices {
    state: AppState,
    practice: PracticeService,
}

impl AppServices {
    /// Build services backed by `SQLite` for local state, and the REST store
    /// for remote sync when configured.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated,
    /// or the HTTP client for the remote store cannot be built.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url, clock).await?;
        let sync = match &config.sync {
            Some(remote) => {
                let remote: Arc<dyn RemoteStateRepository> =
                    Arc::new(RestStateStore::new(remote.clone())?);
                SyncService::new(remote, clock).with_debounce(config.debounce)
            }
            None => SyncService::disabled(),
        };
        Ok(Self::assemble(Arc::clone(&storage.documents), sync, clock).await)
    }

    /// Build services over in-memory repositories, with sync going to the
    /// in-memory remote.
    pub async fn new_in_memory(clock: Clock) -> Self {
        let repo = InMemoryRepository::new();
        let remote: Arc<dyn RemoteStateRepository> = Arc::new(repo.clone());
        let sync = SyncService::new(remote, clock);
        Self::assemble(Arc::new(repo), sync, clock).await
    }

    async fn assemble(
        documents: Arc<dyn DocumentRepository>,
        sync: SyncService,
        clock: Clock,
    ) -> Self {
        let state = AppState::hydrate(LocalSnapshotStore::new(documents), sync).await;
        Self {
            state,
            practice: PracticeService::new(clock),
        }
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    #[must_use]
    pub fn practice(&self) -> &PracticeService {
        &self.practice
    }

    pub fn practice_mut(&mut self) -> &mut PracticeService {
        &mut self.practice
    }

    /// Borrow both halves at once, e.g. for `PracticeService::submit`.
    pub fn split_mut(&mut self) -> (&mut PracticeService, &mut AppState) {
        (&mut self.practice, &mut self.state)
    }

    /// Cancel pending remote work before teardown.
    pub fn shutdown(&mut self) {
        self.state.shutdown();
    }
}
