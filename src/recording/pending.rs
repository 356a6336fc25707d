//! Queue of recording requests from participants who cannot start a mode.

use chrono::{DateTime, Utc};

use super::types::RecordingMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub requester_identity: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-mode request queues, unique by requester identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRequests {
    transcript: Vec<PendingRequest>,
    screen_recording: Vec<PendingRequest>,
}

impl PendingRequests {
    pub fn get(&self, mode: RecordingMode) -> &[PendingRequest] {
        match mode {
            RecordingMode::Transcript => &self.transcript,
            RecordingMode::ScreenRecording => &self.screen_recording,
        }
    }

    pub fn len(&self, mode: RecordingMode) -> usize {
        self.get(mode).len()
    }

    pub fn is_empty(&self, mode: RecordingMode) -> bool {
        self.get(mode).is_empty()
    }

    pub fn first(&self, mode: RecordingMode) -> Option<&PendingRequest> {
        self.get(mode).first()
    }

    fn queue_mut(&mut self, mode: RecordingMode) -> &mut Vec<PendingRequest> {
        match mode {
            RecordingMode::Transcript => &mut self.transcript,
            RecordingMode::ScreenRecording => &mut self.screen_recording,
        }
    }

    /// Returns false if the identity already has a request for `mode`.
    pub(crate) fn insert(&mut self, mode: RecordingMode, identity: &str, timestamp: DateTime<Utc>) -> bool {
        let queue = self.queue_mut(mode);
        if queue.iter().any(|r| r.requester_identity == identity) {
            return false;
        }
        queue.push(PendingRequest {
            requester_identity: identity.to_string(),
            timestamp,
        });
        true
    }

    /// Drop every request made by `identity`, across modes.
    pub(crate) fn remove_identity(&mut self, identity: &str) -> usize {
        let before = self.transcript.len() + self.screen_recording.len();
        self.transcript.retain(|r| r.requester_identity != identity);
        self.screen_recording.retain(|r| r.requester_identity != identity);
        before - (self.transcript.len() + self.screen_recording.len())
    }

    pub(crate) fn clear(&mut self, mode: RecordingMode) -> usize {
        let queue = self.queue_mut(mode);
        let removed = queue.len();
        queue.clear();
        removed
    }

    pub(crate) fn dismiss_first(&mut self, mode: RecordingMode) -> Option<PendingRequest> {
        let queue = self.queue_mut(mode);
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }
}
