//! Recording REST backend.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::BackendConfig;

use super::types::{RecordingMode, SessionMetadata, StartOptions};

#[derive(Debug, Error)]
pub enum BackendError {
    /// The room already has a recording running; the next metadata push
    /// carries its state.
    #[error("recording already started for this room")]
    AlreadyStarted,
    #[error("backend returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request to recording backend failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecordingBackend: Send + Sync {
    async fn start_recording(
        &self,
        room_id: &str,
        mode: RecordingMode,
        options: &StartOptions,
    ) -> Result<SessionMetadata, BackendError>;

    async fn stop_recording(&self, room_id: &str) -> Result<SessionMetadata, BackendError>;
}

#[derive(Debug, Serialize)]
struct StartPayload<'a> {
    mode: RecordingMode,
    options: &'a StartOptions,
}

pub struct HttpRecordingBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRecordingBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        let api_url = config.api_url.trim_end_matches('/').to_string();

        info!("Initialized recording backend at {}", api_url);

        Ok(Self { client, api_url })
    }

    fn room_url(&self, room_id: &str, action: &str) -> String {
        format!("{}/rooms/{}/{}/", self.api_url, room_id, action)
    }

    async fn read_metadata(response: reqwest::Response) -> Result<SessionMetadata, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Recording backend request failed with status {}: {}", status, body);
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Recording backend response: {}", body);
        Ok(SessionMetadata::parse(&body)?)
    }
}

#[async_trait]
impl RecordingBackend for HttpRecordingBackend {
    async fn start_recording(
        &self,
        room_id: &str,
        mode: RecordingMode,
        options: &StartOptions,
    ) -> Result<SessionMetadata, BackendError> {
        let url = self.room_url(room_id, "start-recording");
        info!("Requesting {} start for room {}", mode, room_id);

        let response = self
            .client
            .post(&url)
            .json(&StartPayload { mode, options })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            info!("Room {} already has a recording running", room_id);
            return Err(BackendError::AlreadyStarted);
        }

        Self::read_metadata(response).await
    }

    async fn stop_recording(&self, room_id: &str) -> Result<SessionMetadata, BackendError> {
        let url = self.room_url(room_id, "stop-recording");
        info!("Requesting recording stop for room {}", room_id);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;

        Self::read_metadata(response).await
    }
}
