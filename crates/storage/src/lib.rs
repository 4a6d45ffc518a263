#![forbid(unsafe_code)]

pub mod local;
pub mod repository;
pub mod sqlite;

pub use local::{APP_STATE_KEY, LocalSnapshotStore};
pub use repository::{
    DocumentRepository, InMemoryRepository, PushRecord, RemoteDocument, RemoteStateRepository,
    Storage, StorageError,
};
