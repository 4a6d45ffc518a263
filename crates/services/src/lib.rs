#![forbid(unsafe_code)]

pub mod app_services;
pub mod app_state;
pub mod config;
pub mod error;
pub mod sessions;
pub mod sync;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use app_state::AppState;
pub use config::AppConfig;
pub use error::{AppServicesError, AppStateError, ConfigError, SessionError, SyncError};
pub use sessions::{
    PoolBuilder, PracticePhase, PracticeService, PracticeSession, SessionPhase, SessionPlan,
    SessionProgress,
};
pub use sync::{Identity, ReconcileOutcome, RemoteConfig, RestStateStore, SyncService};
