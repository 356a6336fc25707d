use thiserror::Error;

use super::backend::BackendError;
use super::types::RecordingMode;

/// A request rejected before any network call. Never shown as a dialog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no room id for this session")]
    MissingRoomId,
    #[error("actor is not allowed to use {0}")]
    AccessDenied(RecordingMode),
    #[error("{requested} cannot start while {active} is active")]
    AnotherModeActive {
        requested: RecordingMode,
        active: RecordingMode,
    },
    #[error("{0} is already active")]
    AlreadyActive(RecordingMode),
    #[error("{0} is not active")]
    NotActive(RecordingMode),
    #[error("{0} is not available in this room")]
    ModeUnavailable(RecordingMode),
    #[error("actor can start {0} without asking")]
    RequestNotNeeded(RecordingMode),
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a start or stop for {0} is already in flight")]
    Busy(RecordingMode),
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Sending a peer notification through the transport failed.
    #[error(transparent)]
    Notification(#[from] anyhow::Error),
}
