//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SnapshotError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AppState` when the local write-through fails.
///
/// The in-memory snapshot has already been replaced when this is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppStateError {
    #[error("local write failed: {0}")]
    Storage(#[from] StorageError),
}

/// Errors emitted by the practice workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Persist(#[from] AppStateError),
}

/// Remote replication failures. Logged and swallowed, never fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("pulling remote state failed: {0}")]
    Pull(#[source] StorageError),
    #[error("pushing remote state failed: {0}")]
    Push(#[source] StorageError),
    #[error("remote state is malformed: {0}")]
    Malformed(#[from] SnapshotError),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}
