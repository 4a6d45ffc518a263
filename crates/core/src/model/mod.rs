mod attempt;
mod ids;
mod question;
mod setup;
mod snapshot;

pub use attempt::{Attempt, latest_attempts, missed_question_ids};
pub use ids::{AttemptId, ParseIdError, QuestionId, UserId};
pub use question::{Question, QuestionError, QuestionKind, parse_index_list};
pub use setup::{CategoryFilter, PracticeMode, SessionSetup, SetupError};
pub use snapshot::{SnapshotError, StateSnapshot};
