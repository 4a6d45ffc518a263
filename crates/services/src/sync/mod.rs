//! Best-effort remote replication of the state snapshot.

mod rest;
mod service;

pub use crate::error::SyncError;
pub use rest::{DEFAULT_REMOTE_TIMEOUT, RemoteConfig, RestStateStore};
pub use service::{DEFAULT_DEBOUNCE, Identity, ReconcileOutcome, SyncPhase, SyncService};
