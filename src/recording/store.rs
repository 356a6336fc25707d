//! Observable local recording state.
//!
//! The store is created with the session and handed to the orchestrator.
//! Consumers get snapshots and change notifications; mutation is
//! crate-private and only the orchestrator and reconciler call it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::pending::PendingRequests;
use super::types::{ErrorDialog, ModeStatus, RecordingLanguage, RecordingMode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingState {
    pub transcript: ModeStatus,
    pub screen_recording: ModeStatus,
    pub error_dialog: Option<ErrorDialog>,
    pub language: RecordingLanguage,
    /// Mode whose "saving" notice is currently displayed.
    pub save_notice: Option<RecordingMode>,
    /// Mode whose duration limit was reported by the backend.
    pub limit_reached: Option<RecordingMode>,
    pub pending: PendingRequests,
    /// Mode whose request quick action is expanded.
    pub quick_action: Option<RecordingMode>,
}

/// Flags derived for one mode, as a status panel consumes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeStatuses {
    pub is_another_mode_started: bool,
    pub is_starting: bool,
    pub is_started: bool,
    pub is_stopping: bool,
    pub is_saving: bool,
    pub is_active: bool,
}

/// Room-wide status shown in the recording banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Stopped,
    TranscriptStarting,
    TranscriptStarted,
    TranscriptStopping,
    TranscriptSaving,
    ScreenRecordingStarting,
    ScreenRecordingStarted,
    ScreenRecordingStopping,
    ScreenRecordingSaving,
}

impl RecordingState {
    pub fn with_language(language: RecordingLanguage) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn status(&self, mode: RecordingMode) -> ModeStatus {
        match mode {
            RecordingMode::Transcript => self.transcript,
            RecordingMode::ScreenRecording => self.screen_recording,
        }
    }

    pub(crate) fn set_status(&mut self, mode: RecordingMode, status: ModeStatus) {
        match mode {
            RecordingMode::Transcript => self.transcript = status,
            RecordingMode::ScreenRecording => self.screen_recording = status,
        }
    }

    pub fn active_mode(&self) -> Option<RecordingMode> {
        RecordingMode::ALL
            .into_iter()
            .find(|mode| self.status(*mode).is_active())
    }

    pub fn is_another_mode_started(&self, mode: RecordingMode) -> bool {
        self.status(mode.other()).is_active()
    }

    pub fn statuses(&self, mode: RecordingMode) -> ModeStatuses {
        let status = self.status(mode);
        ModeStatuses {
            is_another_mode_started: self.is_another_mode_started(mode),
            is_starting: status == ModeStatus::Starting,
            is_started: status == ModeStatus::Started,
            is_stopping: status == ModeStatus::Stopping,
            is_saving: status == ModeStatus::Saving,
            is_active: status.is_active(),
        }
    }

    pub fn canonical(&self) -> CanonicalStatus {
        use CanonicalStatus::*;
        match (self.transcript, self.screen_recording) {
            (ModeStatus::Starting, _) => TranscriptStarting,
            (ModeStatus::Started, _) => TranscriptStarted,
            (ModeStatus::Stopping, _) => TranscriptStopping,
            (ModeStatus::Saving, _) => TranscriptSaving,
            (ModeStatus::Idle, ModeStatus::Starting) => ScreenRecordingStarting,
            (ModeStatus::Idle, ModeStatus::Started) => ScreenRecordingStarted,
            (ModeStatus::Idle, ModeStatus::Stopping) => ScreenRecordingStopping,
            (ModeStatus::Idle, ModeStatus::Saving) => ScreenRecordingSaving,
            (ModeStatus::Idle, ModeStatus::Idle) => Stopped,
        }
    }

    fn is_consistent(&self) -> bool {
        !(self.transcript.is_active() && self.screen_recording.is_active())
    }
}

#[derive(Clone)]
pub struct RecordingSessionStore {
    tx: Arc<watch::Sender<RecordingState>>,
}

impl Default for RecordingSessionStore {
    fn default() -> Self {
        Self::new(RecordingState::default())
    }
}

impl RecordingSessionStore {
    pub fn new(initial: RecordingState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> RecordingState {
        self.tx.borrow().clone()
    }

    /// Receiver that is woken on every committed change.
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.tx.subscribe()
    }

    /// Apply `f` to a copy of the state and commit it if it changed.
    ///
    /// A result with two active modes is refused and the state is left as is.
    pub(crate) fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut RecordingState),
    {
        let mut refused = false;
        let changed = self.tx.send_if_modified(|state| {
            let mut next = state.clone();
            f(&mut next);
            if !next.is_consistent() {
                refused = true;
                return false;
            }
            if next == *state {
                return false;
            }
            *state = next;
            true
        });

        if refused {
            warn!("Refused store update that would leave two recording modes active");
        }
        changed
    }

    pub(crate) fn set_status(&self, mode: RecordingMode, status: ModeStatus) -> bool {
        self.modify(|state| state.set_status(mode, status))
    }

    pub(crate) fn set_error_dialog(&self, dialog: Option<ErrorDialog>) {
        self.modify(|state| state.error_dialog = dialog);
    }

    pub(crate) fn set_language(&self, language: RecordingLanguage) {
        self.modify(|state| state.language = language);
    }

    pub(crate) fn set_save_notice(&self, notice: Option<RecordingMode>) {
        self.modify(|state| state.save_notice = notice);
    }

    pub(crate) fn set_limit_reached(&self, mode: Option<RecordingMode>) {
        self.modify(|state| state.limit_reached = mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_stopped() {
        let state = RecordingState::default();
        assert_eq!(state.canonical(), CanonicalStatus::Stopped);
        assert_eq!(state.active_mode(), None);
        assert_eq!(state.language, RecordingLanguage::French);
    }

    #[test]
    fn test_statuses_flags() {
        let mut state = RecordingState::default();
        state.set_status(RecordingMode::ScreenRecording, ModeStatus::Started);

        let screen = state.statuses(RecordingMode::ScreenRecording);
        assert!(screen.is_started && screen.is_active && !screen.is_another_mode_started);

        let transcript = state.statuses(RecordingMode::Transcript);
        assert!(transcript.is_another_mode_started);
        assert!(!transcript.is_active);
        assert_eq!(state.canonical(), CanonicalStatus::ScreenRecordingStarted);
    }

    #[test]
    fn test_store_refuses_two_active_modes() {
        let store = RecordingSessionStore::default();
        assert!(store.set_status(RecordingMode::Transcript, ModeStatus::Starting));
        assert!(!store.set_status(RecordingMode::ScreenRecording, ModeStatus::Starting));

        let state = store.snapshot();
        assert_eq!(state.transcript, ModeStatus::Starting);
        assert_eq!(state.screen_recording, ModeStatus::Idle);
    }

    #[test]
    fn test_store_allows_atomic_handover() {
        let store = RecordingSessionStore::default();
        store.set_status(RecordingMode::Transcript, ModeStatus::Starting);

        assert!(store.modify(|state| {
            state.set_status(RecordingMode::Transcript, ModeStatus::Idle);
            state.set_status(RecordingMode::ScreenRecording, ModeStatus::Started);
        }));
        assert_eq!(store.snapshot().canonical(), CanonicalStatus::ScreenRecordingStarted);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_only() {
        let store = RecordingSessionStore::default();
        let mut rx = store.subscribe();

        store.set_error_dialog(None);
        assert!(!rx.has_changed().unwrap());

        store.set_error_dialog(Some(ErrorDialog::Start));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().error_dialog, Some(ErrorDialog::Start));
    }
}
