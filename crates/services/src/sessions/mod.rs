mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the practice subsystem.
pub use crate::error::SessionError;
pub use plan::{PoolBuilder, SessionPlan};
pub use progress::SessionProgress;
pub use service::{PracticeSession, SessionPhase};
pub use workflow::{PracticePhase, PracticeService};
