use crate::errors::MigrationResult;
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Phase of a [`MigrationEngine`](super::MigrationEngine) call.
///
/// ```text
/// Idle -> Flushing -> Inspecting -> Planning -> NoOp
///                                            -> Executing(1 of n) .. Executing(n of n)
///                                               -> Verifying -> Swapping -> Done
/// ```
///
/// Any error moves a call to `FatalAborted`. Every call starts again from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MigrationState {
    Idle,
    Flushing,
    Inspecting,
    Planning,
    NoOp,
    /// Applying step `step` (1-based) of `of`.
    Executing { step: usize, of: usize },
    Verifying,
    Swapping,
    Done,
    FatalAborted,
}

impl MigrationState {
    /// `true` for the states a call ends in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationState::NoOp | MigrationState::Done | MigrationState::FatalAborted
        )
    }
}

impl Display for MigrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationState::Idle => write!(f, "Idle"),
            MigrationState::Flushing => write!(f, "Flushing"),
            MigrationState::Inspecting => write!(f, "Inspecting"),
            MigrationState::Planning => write!(f, "Planning"),
            MigrationState::NoOp => write!(f, "NoOp"),
            MigrationState::Executing { step, of } => write!(f, "Executing({} of {})", step, of),
            MigrationState::Verifying => write!(f, "Verifying"),
            MigrationState::Swapping => write!(f, "Swapping"),
            MigrationState::Done => write!(f, "Done"),
            MigrationState::FatalAborted => write!(f, "FatalAborted"),
        }
    }
}

/// A state transition of a migration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEvent {
    state: MigrationState,
    store_path: PathBuf,
    timestamp: DateTime<Utc>,
}

impl MigrationEvent {
    pub(crate) fn new(state: MigrationState, store_path: &Path) -> Self {
        MigrationEvent {
            state,
            store_path: store_path.to_path_buf(),
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub trait MigrationEventCallback: Fn(&MigrationEvent) -> MigrationResult<()> + Send + Sync {}

impl<F> MigrationEventCallback for F where F: Fn(&MigrationEvent) -> MigrationResult<()> + Send + Sync
{}

/// Receives every [`MigrationEvent`] of the engine it is registered with.
///
/// Listeners run synchronously on the migrating thread. A listener error is
/// logged and never aborts the migration.
#[derive(Clone)]
pub struct MigrationEventListener {
    on_event: Arc<dyn MigrationEventCallback>,
}

impl MigrationEventListener {
    pub fn new(on_event: impl MigrationEventCallback + 'static) -> Self {
        MigrationEventListener {
            on_event: Arc::new(on_event),
        }
    }

    pub(crate) fn notify(&self, event: &MigrationEvent) {
        if let Err(e) = (self.on_event)(event) {
            log::warn!("Migration listener failed on {}: {}", event.state(), e);
        }
    }
}

impl Debug for MigrationEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEventListener").finish()
    }
}
