//! Realtime transport seam.
//!
//! The media/data transport is owned by the conferencing layer. This crate
//! only needs to send small payloads and to be told about data, metadata,
//! recording-indicator and disconnect events.

use anyhow::Result;
use async_trait::async_trait;

/// Delivery options for a data-channel send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub reliable: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { reliable: true }
    }
}

#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Send `payload` to every participant, or only to `destinations`.
    async fn send(
        &self,
        payload: Vec<u8>,
        options: SendOptions,
        destinations: Option<&[String]>,
    ) -> Result<()>;

    /// Identities of remote participants holding an administrator or owner role.
    fn admin_identities(&self) -> Vec<String>;
}

/// Events the transport pushes into a recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    DataReceived {
        payload: Vec<u8>,
        sender: Option<String>,
    },
    MetadataChanged(String),
    RecordingIndicatorChanged(bool),
    ParticipantDisconnected(String),
}
