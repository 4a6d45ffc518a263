use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use quiz_core::Clock;
use quiz_core::model::{StateSnapshot, UserId};
use storage::repository::RemoteStateRepository;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::SyncError;

/// Quiet period used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Signed-in identity as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self { id, email: None }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Per-identity reconciliation state. Pushes are only issued in `Reconciled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    SignedOut,
    Unreconciled(UserId),
    Reconciled(UserId),
}

/// What an identity change did to local state.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// No identity; nothing was contacted.
    SignedOut,
    /// Sync has no remote store configured.
    Disabled,
    /// Same identity already reconciled; no pull was issued.
    AlreadyReconciled,
    /// Remote had a document; it replaces local state.
    AdoptedRemote(StateSnapshot),
    /// Remote had no document; local state was pushed as the seed.
    SeededRemote,
    /// Pull failed or returned a malformed document. Local state stays
    /// authoritative and the identity stays unreconciled.
    Failed(SyncError),
}

/// Keeps a best-effort replica of the snapshot in the remote store.
///
/// On login it pulls once ("cloud wins") or seeds the remote; afterwards each
/// local mutation schedules a debounced push of the latest snapshot.
pub struct SyncService {
    remote: Option<Arc<dyn RemoteStateRepository>>,
    clock: Clock,
    debounce: Duration,
    phase: SyncPhase,
    pending: Option<JoinHandle<()>>,
    /// Generation of the latest scheduled push.
    generation: u64,
    /// Serializes detached pushes; holds the generation last sent.
    lane: Arc<Mutex<u64>>,
}

impl SyncService {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStateRepository>, clock: Clock) -> Self {
        Self {
            remote: Some(remote),
            clock,
            debounce: DEFAULT_DEBOUNCE,
            phase: SyncPhase::SignedOut,
            pending: None,
            generation: 0,
            lane: Arc::new(Mutex::new(0)),
        }
    }

    /// A sync service that never talks to a remote store.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            remote: None,
            clock: Clock::default(),
            debounce: DEFAULT_DEBOUNCE,
            phase: SyncPhase::SignedOut,
            pending: None,
            generation: 0,
            lane: Arc::new(Mutex::new(0)),
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.remote.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        matches!(self.phase, SyncPhase::Reconciled(_))
    }

    /// React to the identity provider reporting `identity`.
    ///
    /// Presence edge: pull once; adopt a well-formed remote snapshot or seed
    /// the remote from `local` when there is none. Absence edge: forget the
    /// reconciled flag without contacting the remote.
    pub async fn set_identity(
        &mut self,
        identity: Option<&Identity>,
        local: &StateSnapshot,
    ) -> ReconcileOutcome {
        let Some(identity) = identity else {
            self.cancel_pending();
            if self.phase != SyncPhase::SignedOut {
                info!("signed out; remote sync paused");
            }
            self.phase = SyncPhase::SignedOut;
            return ReconcileOutcome::SignedOut;
        };

        let switched = match &self.phase {
            SyncPhase::Reconciled(current) if *current == identity.id => {
                return ReconcileOutcome::AlreadyReconciled;
            }
            SyncPhase::Reconciled(current) | SyncPhase::Unreconciled(current) => {
                *current != identity.id
            }
            SyncPhase::SignedOut => false,
        };
        if switched {
            self.cancel_pending();
        }
        self.phase = SyncPhase::Unreconciled(identity.id.clone());

        let Some(remote) = self.remote.clone() else {
            return ReconcileOutcome::Disabled;
        };

        match Self::pull(remote.as_ref(), &identity.id).await {
            Ok(Some(snapshot)) => {
                info!(
                    "adopting remote state for {}: {} questions, {} attempts",
                    identity.id,
                    snapshot.questions.len(),
                    snapshot.attempts.len()
                );
                self.phase = SyncPhase::Reconciled(identity.id.clone());
                ReconcileOutcome::AdoptedRemote(snapshot)
            }
            Ok(None) => {
                match remote
                    .push_state(&identity.id, local, self.clock.now())
                    .await
                {
                    Ok(()) => info!("seeded remote state for {}", identity.id),
                    Err(err) => warn!("{}", SyncError::Push(err)),
                }
                self.phase = SyncPhase::Reconciled(identity.id.clone());
                ReconcileOutcome::SeededRemote
            }
            Err(err) => {
                warn!("reconciliation for {} failed: {err}", identity.id);
                ReconcileOutcome::Failed(err)
            }
        }
    }

    async fn pull(
        remote: &dyn RemoteStateRepository,
        user_id: &UserId,
    ) -> Result<Option<StateSnapshot>, SyncError> {
        let document = remote.pull_state(user_id).await.map_err(SyncError::Pull)?;
        document
            .map(|doc| StateSnapshot::from_value_strict(doc.state).map_err(SyncError::from))
            .transpose()
    }

    /// Schedule a push of `snapshot` after the quiet period, replacing any
    /// push still waiting. Returns `false` when not reconciled.
    ///
    /// A push whose timer already fired keeps running. Pushes are sent one at
    /// a time in scheduling order; one overtaken by a newer push is dropped.
    pub fn schedule_push(&mut self, snapshot: StateSnapshot) -> bool {
        let (SyncPhase::Reconciled(user_id), Some(remote)) = (&self.phase, &self.remote) else {
            debug!("push skipped: not reconciled");
            return false;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!("push skipped: no async runtime available");
            return false;
        };

        let remote = Arc::clone(remote);
        let user_id = user_id.clone();
        self.cancel_pending();

        self.generation += 1;
        let generation = self.generation;
        let lane = Arc::clone(&self.lane);
        let clock = self.clock;
        let delay = self.debounce;
        let spawner = runtime.clone();

        debug!("push #{generation} for {user_id} scheduled in {delay:?}");
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // detached so cancelling the timer cannot interrupt a write in flight
            spawner.spawn(async move {
                let mut last_sent = lane.lock().await;
                if *last_sent >= generation {
                    debug!("push #{generation} for {user_id} superseded");
                    return;
                }
                *last_sent = generation;
                match remote.push_state(&user_id, &snapshot, clock.now()).await {
                    Ok(()) => debug!("pushed state #{generation} for {user_id}"),
                    Err(err) => warn!("{}", SyncError::Push(err)),
                }
            });
        }));
        true
    }

    /// Cancel a scheduled push that has not fired yet.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
