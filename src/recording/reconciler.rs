//! Convergence of local recording state with backend-pushed metadata.
//!
//! The backend publishes a full `{recording_mode, recording_status}`
//! snapshot in room metadata; the transport separately reports whether
//! capture is actually running. Local state may run ahead of both after an
//! acknowledged start or stop. Each event re-derives every mode from the
//! latest inputs and folds the result into the store.
//!
//! There is no timeout: if the backend never pushes again, optimistic
//! states stay where they are until the next metadata or indicator event.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::store::RecordingSessionStore;
use super::types::{MetadataStatus, ModeStatus, RecordingMode, SessionMetadata};

/// Status of `mode` implied by metadata and the recording indicator alone.
pub fn derive_status(metadata: &SessionMetadata, recording: bool, mode: RecordingMode) -> ModeStatus {
    if metadata.recording_mode != Some(mode) {
        return ModeStatus::Idle;
    }

    match metadata.recording_status {
        Some(MetadataStatus::Starting) => ModeStatus::Starting,
        // Capture has not begun yet; avoid flashing "started".
        Some(MetadataStatus::Started) if !recording => ModeStatus::Starting,
        Some(MetadataStatus::Started) => ModeStatus::Started,
        Some(MetadataStatus::Saving) => ModeStatus::Saving,
        Some(
            MetadataStatus::Stopped
            | MetadataStatus::Aborted
            | MetadataStatus::FailedToStart
            | MetadataStatus::FailedToStop
            | MetadataStatus::Unknown,
        )
        | None => ModeStatus::Idle,
    }
}

/// Banner key such as `transcript.started`, present while a mode is
/// starting or started.
pub fn display_key(metadata: &SessionMetadata, recording: bool) -> Option<String> {
    let mode = metadata.recording_mode?;
    let status = match metadata.recording_status? {
        MetadataStatus::Starting => "starting",
        MetadataStatus::Started if recording => "started",
        MetadataStatus::Started => "starting",
        _ => return None,
    };
    Some(format!("{}.{}", mode.as_str(), status))
}

/// Fold a derived status into the local one.
///
/// `fresh` is false while the metadata still predates the optimistic
/// transition, so a stale terminal snapshot cannot undo it.
fn resolve(
    local: ModeStatus,
    derived: ModeStatus,
    metadata: &SessionMetadata,
    mode: RecordingMode,
    fresh: bool,
) -> ModeStatus {
    match local {
        ModeStatus::Starting => {
            let other_active = metadata.active_mode() == Some(mode.other());
            let mentions_mode = metadata.recording_mode == Some(mode);
            if other_active {
                ModeStatus::Idle
            } else if !mentions_mode || (!fresh && derived == ModeStatus::Idle) {
                ModeStatus::Starting
            } else {
                derived
            }
        }
        ModeStatus::Stopping => match derived {
            ModeStatus::Starting | ModeStatus::Started => ModeStatus::Stopping,
            ModeStatus::Idle if !fresh => ModeStatus::Stopping,
            other => other,
        },
        ModeStatus::Idle | ModeStatus::Started | ModeStatus::Saving => derived,
    }
}

#[derive(Debug, Default)]
struct Inputs {
    metadata: SessionMetadata,
    recording: bool,
    generation: u64,
    /// Metadata generation at which each optimistic status was entered.
    optimistic: HashMap<RecordingMode, u64>,
}

pub struct MetadataReconciler {
    store: RecordingSessionStore,
    inputs: Mutex<Inputs>,
}

impl MetadataReconciler {
    pub fn new(store: RecordingSessionStore) -> Self {
        Self {
            store,
            inputs: Mutex::new(Inputs::default()),
        }
    }

    pub fn metadata(&self) -> SessionMetadata {
        self.inputs.lock().metadata.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.inputs.lock().recording
    }

    pub fn display_key(&self) -> Option<String> {
        let inputs = self.inputs.lock();
        display_key(&inputs.metadata, inputs.recording)
    }

    /// Handle a room metadata push. Malformed metadata keeps the previous snapshot.
    pub fn on_metadata_changed(&self, raw: &str) {
        let metadata = match SessionMetadata::parse(raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to parse room metadata: {}", e);
                return;
            }
        };

        info!(
            "Room metadata: mode={:?} status={:?}",
            metadata.recording_mode, metadata.recording_status
        );

        let mut inputs = self.inputs.lock();
        inputs.metadata = metadata;
        inputs.generation += 1;
        self.reconcile(&mut inputs);
    }

    pub fn on_recording_indicator_changed(&self, recording: bool) {
        debug!("Recording indicator changed: {}", recording);
        let mut inputs = self.inputs.lock();
        inputs.recording = recording;
        self.reconcile(&mut inputs);
    }

    /// Enter an acknowledged-but-unconfirmed status for `mode`, then
    /// reconcile in case the backend push already arrived.
    pub(crate) fn apply_optimistic(&self, mode: RecordingMode, status: ModeStatus) -> bool {
        let mut inputs = self.inputs.lock();
        if !self.store.set_status(mode, status) {
            debug!("Optimistic {} for {} not applied", status.as_str(), mode);
            return false;
        }
        let generation = inputs.generation;
        inputs.optimistic.insert(mode, generation);
        self.reconcile(&mut inputs);
        true
    }

    fn reconcile(&self, inputs: &mut Inputs) {
        let current = self.store.snapshot();
        let mut next = [(RecordingMode::Transcript, ModeStatus::Idle); 2];

        for (slot, mode) in next.iter_mut().zip(RecordingMode::ALL) {
            let local = current.status(mode);
            let derived = derive_status(&inputs.metadata, inputs.recording, mode);
            let fresh = inputs
                .optimistic
                .get(&mode)
                .map_or(true, |since| inputs.generation > *since);
            *slot = (mode, resolve(local, derived, &inputs.metadata, mode, fresh));
        }

        for (mode, status) in next {
            if !matches!(status, ModeStatus::Starting | ModeStatus::Stopping) {
                inputs.optimistic.remove(&mode);
            }
        }

        let changed = self.store.modify(|state| {
            for (mode, status) in next {
                state.set_status(mode, status);
            }
        });

        if changed {
            let state = self.store.snapshot();
            info!("Recording status reconciled: {:?}", state.canonical());
        }
    }
}
