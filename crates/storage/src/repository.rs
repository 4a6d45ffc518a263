use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{StateSnapshot, UserId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key-value store for whole documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch the document stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_document(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be stored.
    async fn put_document(&self, key: &str, body: &str) -> Result<(), StorageError>;
}

/// A replicated state document as held by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Raw `state` payload; shape is validated by the caller.
    pub state: Value,
    pub updated_at: DateTime<Utc>,
}

/// Remote document store keyed by user id, one `state` document per user.
#[async_trait]
pub trait RemoteStateRepository: Send + Sync {
    /// Fetch the user's document.
    ///
    /// `Ok(None)` means "no document", which is distinct from a document
    /// holding an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decoding failures.
    async fn pull_state(&self, user_id: &UserId) -> Result<Option<RemoteDocument>, StorageError>;

    /// Create or replace the user's document, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected or cannot be sent.
    async fn push_state(
        &self,
        user_id: &UserId,
        snapshot: &StateSnapshot,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// One recorded remote write, kept by `InMemoryRepository` for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRecord {
    pub user_id: UserId,
    pub snapshot: StateSnapshot,
    pub updated_at: DateTime<Utc>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Serves both as the local document store and as a fake remote store.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    documents: Arc<Mutex<HashMap<String, String>>>,
    remote: Arc<Mutex<HashMap<UserId, RemoteDocument>>>,
    pushes: Arc<Mutex<Vec<PushRecord>>>,
    pulls: Arc<AtomicUsize>,
    remote_offline: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw remote document for `user_id`, bypassing the push log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn seed_remote(
        &self,
        user_id: &UserId,
        state: Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .remote
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user_id.clone(), RemoteDocument { state, updated_at });
        Ok(())
    }

    /// Every successful push so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn pushes(&self) -> Result<Vec<PushRecord>, StorageError> {
        let guard = self
            .pushes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    /// Number of remote pulls attempted so far.
    #[must_use]
    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Make every remote call fail until switched back.
    pub fn set_remote_offline(&self, offline: bool) {
        self.remote_offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.remote_offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("remote offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get_document(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_document(&self, key: &str, body: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), body.to_owned());
        Ok(())
    }
}

#[async_trait]
impl RemoteStateRepository for InMemoryRepository {
    async fn pull_state(&self, user_id: &UserId) -> Result<Option<RemoteDocument>, StorageError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let guard = self
            .remote
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user_id).cloned())
    }

    async fn push_state(
        &self,
        user_id: &UserId,
        snapshot: &StateSnapshot,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.ensure_online()?;
        let state = serde_json::to_value(snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        {
            let mut guard = self
                .remote
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.insert(user_id.clone(), RemoteDocument { state, updated_at });
        }
        let mut log = self
            .pushes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        log.push(PushRecord {
            user_id: user_id.clone(),
            snapshot: snapshot.clone(),
            updated_at,
        });
        Ok(())
    }
}

/// Aggregates the local document repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentRepository>,
}
