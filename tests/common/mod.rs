#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use roomrec::config::Config;
use roomrec::recording::{
    AccessPolicy, Actor, BackendError, MetadataStatus, NotificationBus, NotificationMessage,
    OrchestratorSettings, RecordingBackend, RecordingMode, RecordingOrchestrator, RoomRole,
    RoomTransport, SendOptions, SessionMetadata, StartOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ROOM: &str = "room-42";

#[derive(Debug, Clone)]
pub struct SentPayload {
    pub payload: Vec<u8>,
    pub destinations: Option<Vec<String>>,
}

impl SentPayload {
    pub fn message(&self) -> NotificationMessage {
        NotificationBus::decode(&self.payload).expect("sent payload decodes")
    }
}

/// Records every payload instead of putting it on the wire.
#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<SentPayload>>,
    admins: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn with_admins(admins: &[&str]) -> Arc<Self> {
        let transport = Self::default();
        *transport.admins.lock() = admins.iter().map(|a| a.to_string()).collect();
        Arc::new(transport)
    }

    pub fn sent(&self) -> Vec<SentPayload> {
        self.sent.lock().clone()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|sent| {
                serde_json::to_value(sent.message().kind)
                    .unwrap()
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }
}

#[async_trait]
impl RoomTransport for FakeTransport {
    async fn send(
        &self,
        payload: Vec<u8>,
        _options: SendOptions,
        destinations: Option<&[String]>,
    ) -> anyhow::Result<()> {
        self.sent.lock().push(SentPayload {
            payload,
            destinations: destinations.map(|d| d.to_vec()),
        });
        Ok(())
    }

    fn admin_identities(&self) -> Vec<String> {
        self.admins.lock().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    AlreadyStarted,
    Fail(u16),
}

/// Backend with scripted replies and call counters.
pub struct FakeBackend {
    start_reply: Mutex<Reply>,
    stop_reply: Mutex<Reply>,
    delay: Duration,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub last_options: Mutex<Option<StartOptions>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::delayed(Duration::ZERO)
    }

    pub fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            start_reply: Mutex::new(Reply::Ok),
            stop_reply: Mutex::new(Reply::Ok),
            delay,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    pub fn reply_to_start(&self, reply: Reply) {
        *self.start_reply.lock() = reply;
    }

    pub fn reply_to_stop(&self, reply: Reply) {
        *self.stop_reply.lock() = reply;
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, reply: Reply, metadata: SessionMetadata) -> Result<SessionMetadata, BackendError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match reply {
            Reply::Ok => Ok(metadata),
            Reply::AlreadyStarted => Err(BackendError::AlreadyStarted),
            Reply::Fail(status) => Err(BackendError::Http {
                status,
                body: "backend unavailable".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RecordingBackend for FakeBackend {
    async fn start_recording(
        &self,
        _room_id: &str,
        mode: RecordingMode,
        options: &StartOptions,
    ) -> Result<SessionMetadata, BackendError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = Some(options.clone());
        let reply = *self.start_reply.lock();
        self.answer(reply, SessionMetadata::new(mode, MetadataStatus::Starting))
            .await
    }

    async fn stop_recording(&self, _room_id: &str) -> Result<SessionMetadata, BackendError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let reply = *self.stop_reply.lock();
        self.answer(reply, SessionMetadata::default()).await
    }
}

pub fn admin(identity: &str) -> Actor {
    Actor::new(identity, true, RoomRole::Administrator)
}

pub fn member(identity: &str) -> Actor {
    Actor::new(identity, true, RoomRole::Member)
}

pub fn orchestrator(
    actor: Actor,
    transport: Arc<FakeTransport>,
    backend: Arc<FakeBackend>,
) -> RecordingOrchestrator {
    let config = Config::default();
    RecordingOrchestrator::new(
        Some(ROOM.to_string()),
        actor,
        AccessPolicy::from_config(&config),
        transport,
        backend,
        OrchestratorSettings::from_config(&config),
    )
}

pub fn metadata(mode: RecordingMode, status: MetadataStatus) -> String {
    serde_json::to_string(&SessionMetadata::new(mode, status)).unwrap()
}
