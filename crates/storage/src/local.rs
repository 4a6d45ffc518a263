use log::{debug, warn};
use quiz_core::model::StateSnapshot;
use std::sync::Arc;

use crate::repository::{DocumentRepository, StorageError};

/// Fixed key under which the whole snapshot is stored.
pub const APP_STATE_KEY: &str = "quiz_state_v1";

/// Durable local copy of the `{questions, attempts}` snapshot.
///
/// Pure load/save: no merge logic lives here.
#[derive(Clone)]
pub struct LocalSnapshotStore {
    documents: Arc<dyn DocumentRepository>,
    key: String,
}

impl LocalSnapshotStore {
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentRepository>) -> Self {
        Self {
            documents,
            key: APP_STATE_KEY.to_owned(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Read the persisted snapshot.
    ///
    /// Never fails: an absent, unreadable or corrupt document yields an empty
    /// snapshot.
    pub async fn load(&self) -> StateSnapshot {
        let raw = match self.documents.get_document(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no persisted state under {}", self.key);
                return StateSnapshot::default();
            }
            Err(err) => {
                warn!("reading persisted state failed, starting empty: {err}");
                return StateSnapshot::default();
            }
        };

        match StateSnapshot::from_json_lenient(&raw) {
            Ok(snapshot) => {
                debug!(
                    "hydrated {} questions and {} attempts",
                    snapshot.questions.len(),
                    snapshot.attempts.len()
                );
                snapshot
            }
            Err(err) => {
                warn!("persisted state is malformed, starting empty: {err}");
                StateSnapshot::default()
            }
        }
    }

    /// Overwrite the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let body = snapshot
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.documents.put_document(&self.key, &body).await
    }
}
