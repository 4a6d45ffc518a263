use rand::Rng;

use quiz_core::Clock;
use quiz_core::model::{Attempt, SessionSetup, StateSnapshot};

use super::plan::PoolBuilder;
use super::service::{PracticeSession, SessionPhase};
use crate::app_state::AppState;
use crate::error::SessionError;

/// Top-level practice screen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticePhase {
    Setup,
    Running,
    Submitted,
    Completed,
}

impl From<SessionPhase> for PracticePhase {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Running => Self::Running,
            SessionPhase::Submitted => Self::Submitted,
            SessionPhase::Completed => Self::Completed,
        }
    }
}

/// Holds the setup criteria and the optional active run, and routes graded
/// attempts into the application state.
#[derive(Debug)]
pub struct PracticeService {
    clock: Clock,
    setup: SessionSetup,
    run: Option<PracticeSession>,
    pool_size: usize,
}

impl PracticeService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            setup: SessionSetup::default(),
            run: None,
            pool_size: 0,
        }
    }

    #[must_use]
    pub fn setup(&self) -> &SessionSetup {
        &self.setup
    }

    /// Replace the criteria used by the next `start_session`.
    pub fn set_setup(&mut self, setup: SessionSetup) {
        self.setup = setup;
    }

    #[must_use]
    pub fn phase(&self) -> PracticePhase {
        self.run
            .as_ref()
            .map_or(PracticePhase::Setup, |run| run.phase().into())
    }

    #[must_use]
    pub fn run(&self) -> Option<&PracticeSession> {
        self.run.as_ref()
    }

    /// Number of bank questions that matched the filters at the last start.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Build a pool from `snapshot` with the current setup and start a run.
    pub fn start_session(&mut self, snapshot: &StateSnapshot) -> &PracticeSession {
        self.start_session_with_rng(snapshot, &mut rand::rng())
    }

    pub fn start_session_with_rng<R: Rng + ?Sized>(
        &mut self,
        snapshot: &StateSnapshot,
        rng: &mut R,
    ) -> &PracticeSession {
        let plan = PoolBuilder::new(&snapshot.questions, &snapshot.attempts)
            .build_with_rng(&self.setup, rng);
        self.pool_size = plan.pool_size;
        self.run.insert(PracticeSession::new(plan.questions))
    }

    pub fn toggle_selection(&mut self, index: usize) {
        if let Some(run) = self.run.as_mut() {
            run.toggle_selection(index);
        }
    }

    /// Grade the current selection and record the attempt in `state`.
    ///
    /// Returns `Ok(None)` when there was nothing to submit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persist` if the local write fails. The run has
    /// still moved to `Submitted` and the attempt is in the in-memory history.
    pub async fn submit(&mut self, state: &mut AppState) -> Result<Option<Attempt>, SessionError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(None);
        };
        let Some(attempt) = run.submit(self.clock.now_millis()) else {
            return Ok(None);
        };
        state.record_attempt(attempt.clone()).await?;
        Ok(Some(attempt))
    }

    pub fn advance(&mut self) {
        if let Some(run) = self.run.as_mut() {
            run.advance();
        }
    }

    /// Replay the same pool. Only meaningful once the run is completed.
    pub fn restart_same_session(&mut self) {
        if let Some(run) = self.run.as_mut().filter(|run| run.is_complete()) {
            run.restart();
        }
    }

    /// Replay only the questions missed in the finished run.
    ///
    /// Returns `false` when there is no completed run or nothing was missed.
    pub fn retry_missed(&mut self) -> bool {
        self.run
            .as_mut()
            .filter(|run| run.is_complete())
            .is_some_and(PracticeSession::retry_missed)
    }

    /// Drop the run and return to setup.
    pub fn new_setup(&mut self) {
        self.run = None;
        self.pool_size = 0;
    }
}
