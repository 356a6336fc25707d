//! A joined room: the orchestrator plus the one task that feeds it
//! transport events.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;

use super::access::AccessPolicy;
use super::backend::RecordingBackend;
use super::orchestrator::{OrchestratorSettings, RecordingOrchestrator};
use super::transport::{RoomTransport, TransportEvent};
use super::types::Actor;

pub struct RecordingSession {
    orchestrator: Arc<RecordingOrchestrator>,
    pump: JoinHandle<()>,
}

impl RecordingSession {
    /// Start draining `events` into `orchestrator`. Must be called inside a
    /// tokio runtime.
    pub fn join(orchestrator: RecordingOrchestrator, mut events: mpsc::Receiver<TransportEvent>) -> Self {
        let orchestrator = Arc::new(orchestrator);
        let target = Arc::clone(&orchestrator);

        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                target.handle_event(event);
            }
            debug!("Transport event stream closed");
        });

        info!(
            "Joined recording session for room {}",
            orchestrator.room_id().unwrap_or("<none>")
        );

        Self { orchestrator, pump }
    }

    pub fn from_config(
        config: &Config,
        room_id: Option<String>,
        actor: Actor,
        transport: Arc<dyn RoomTransport>,
        backend: Arc<dyn RecordingBackend>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        let orchestrator = RecordingOrchestrator::new(
            room_id,
            actor,
            AccessPolicy::from_config(config),
            transport,
            backend,
            OrchestratorSettings::from_config(config),
        );
        Self::join(orchestrator, events)
    }

    pub fn orchestrator(&self) -> &Arc<RecordingOrchestrator> {
        &self.orchestrator
    }

    pub fn leave(self) {
        info!(
            "Leaving recording session for room {}",
            self.orchestrator.room_id().unwrap_or("<none>")
        );
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.pump.abort();
        self.orchestrator.shutdown();
    }
}
