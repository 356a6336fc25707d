//! Peer notifications over the room data channel.
//!
//! Messages are small JSON envelopes `{ "type": ..., "data"?: ... }`.
//! Anything that does not decode is dropped without surfacing an error:
//! the data channel is shared with unrelated features and delivery is
//! at-most-once anyway.

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::transport::{RoomTransport, SendOptions};
use super::types::RecordingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    TranscriptionRequested,
    TranscriptionStarted,
    TranscriptionStopped,
    TranscriptionLimitReached,
    ScreenRecordingRequested,
    ScreenRecordingStarted,
    ScreenRecordingStopped,
    ScreenRecordingLimitReached,
}

/// What a notification says happened, independent of the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Requested,
    Started,
    Stopped,
    LimitReached,
}

impl NotificationType {
    pub fn new(mode: RecordingMode, kind: NotificationKind) -> Self {
        use NotificationKind::*;
        match (mode, kind) {
            (RecordingMode::Transcript, Requested) => Self::TranscriptionRequested,
            (RecordingMode::Transcript, Started) => Self::TranscriptionStarted,
            (RecordingMode::Transcript, Stopped) => Self::TranscriptionStopped,
            (RecordingMode::Transcript, LimitReached) => Self::TranscriptionLimitReached,
            (RecordingMode::ScreenRecording, Requested) => Self::ScreenRecordingRequested,
            (RecordingMode::ScreenRecording, Started) => Self::ScreenRecordingStarted,
            (RecordingMode::ScreenRecording, Stopped) => Self::ScreenRecordingStopped,
            (RecordingMode::ScreenRecording, LimitReached) => Self::ScreenRecordingLimitReached,
        }
    }

    pub fn mode(&self) -> RecordingMode {
        match self {
            Self::TranscriptionRequested
            | Self::TranscriptionStarted
            | Self::TranscriptionStopped
            | Self::TranscriptionLimitReached => RecordingMode::Transcript,
            Self::ScreenRecordingRequested
            | Self::ScreenRecordingStarted
            | Self::ScreenRecordingStopped
            | Self::ScreenRecordingLimitReached => RecordingMode::ScreenRecording,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::TranscriptionRequested | Self::ScreenRecordingRequested => NotificationKind::Requested,
            Self::TranscriptionStarted | Self::ScreenRecordingStarted => NotificationKind::Started,
            Self::TranscriptionStopped | Self::ScreenRecordingStopped => NotificationKind::Stopped,
            Self::TranscriptionLimitReached | Self::ScreenRecordingLimitReached => {
                NotificationKind::LimitReached
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl NotificationMessage {
    pub fn new(kind: NotificationType) -> Self {
        Self { kind, data: None }
    }
}

/// Outcome of a broadcast attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Throttled,
}

/// Sliding-window limiter: at most `max` acquisitions in any `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max: usize,
    window: Duration,
    sent: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            sent: VecDeque::new(),
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        while let Some(oldest) = self.sent.front() {
            if now.duration_since(*oldest) >= self.window {
                self.sent.pop_front();
            } else {
                break;
            }
        }

        if self.sent.len() >= self.max {
            return false;
        }
        self.sent.push_back(now);
        true
    }

    pub fn reset(&mut self) {
        self.sent.clear();
    }
}

pub struct NotificationBus {
    transport: Arc<dyn RoomTransport>,
    limiter: Mutex<RateLimiter>,
}

impl NotificationBus {
    pub fn new(transport: Arc<dyn RoomTransport>, limiter: RateLimiter) -> Self {
        Self {
            transport,
            limiter: Mutex::new(limiter),
        }
    }

    pub fn encode(message: &NotificationMessage) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(message)?)
    }

    /// Decode a data-channel payload. Never fails loudly.
    pub fn decode(payload: &[u8]) -> Option<NotificationMessage> {
        let text = std::str::from_utf8(payload).ok()?;
        match serde_json::from_str(text) {
            Ok(message) => Some(message),
            Err(e) => {
                trace!("Ignoring undecodable data payload: {}", e);
                None
            }
        }
    }

    /// Send a notification to the room, or to `destinations` only.
    pub async fn broadcast(
        &self,
        kind: NotificationType,
        data: Option<Value>,
        destinations: Option<&[String]>,
    ) -> Result<Delivery> {
        if !self.limiter.lock().try_acquire() {
            warn!("Notification {:?} dropped by rate limiter", kind);
            return Ok(Delivery::Throttled);
        }

        let payload = Self::encode(&NotificationMessage { kind, data })?;
        self.transport
            .send(payload, SendOptions { reliable: true }, destinations)
            .await?;

        debug!(
            "Broadcast {:?} to {}",
            kind,
            destinations.map_or("room".to_string(), |d| format!("{} participant(s)", d.len()))
        );
        Ok(Delivery::Sent)
    }

    pub fn admin_identities(&self) -> Vec<String> {
        self.transport.admin_identities()
    }

    pub fn reset(&self) {
        self.limiter.lock().reset();
    }
}
