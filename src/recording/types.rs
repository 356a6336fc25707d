//! Recording domain types shared by the store, reconciler and orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which capture kind a room session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    Transcript,
    ScreenRecording,
}

impl RecordingMode {
    pub const ALL: [RecordingMode; 2] = [RecordingMode::Transcript, RecordingMode::ScreenRecording];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::ScreenRecording => "screen_recording",
        }
    }

    /// The mode that is mutually exclusive with this one.
    pub fn other(&self) -> RecordingMode {
        match self {
            Self::Transcript => Self::ScreenRecording,
            Self::ScreenRecording => Self::Transcript,
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "transcript" => Ok(Self::Transcript),
            "screen_recording" => Ok(Self::ScreenRecording),
            other => Err(format!(
                "unknown recording mode '{other}' (expected transcript or screen_recording)"
            )),
        }
    }
}

/// Permission tier the backend requires to start a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingPermission {
    AdminOwner,
    Authenticated,
}

/// Local status of one recording mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeStatus {
    #[default]
    Idle,
    Starting,
    Started,
    Stopping,
    Saving,
}

impl ModeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Saving => "saving",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Which operation's error dialog is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorDialog {
    Start,
    Stop,
}

impl ErrorDialog {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// Language preference forwarded to the transcription backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordingLanguage {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "auto")]
    Automatic,
}

impl RecordingLanguage {
    /// Language code to send, `None` when the backend should detect it.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::English => Some("en"),
            Self::French => Some("fr"),
            Self::Automatic => None,
        }
    }
}

impl FromStr for RecordingLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "fr" | "french" => Ok(Self::French),
            "auto" | "automatic" => Ok(Self::Automatic),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Recording status as published by the backend in room metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    Starting,
    Started,
    Saving,
    Stopped,
    Aborted,
    #[serde(alias = "failedToStart")]
    FailedToStart,
    #[serde(alias = "failedToStop")]
    FailedToStop,
    #[serde(other)]
    Unknown,
}

impl MetadataStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Started | Self::Saving)
    }
}

/// Authoritative recording snapshot carried in room metadata.
///
/// Every push replaces the previous snapshot wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_mode: Option<RecordingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_status: Option<MetadataStatus>,
}

impl SessionMetadata {
    pub fn new(mode: RecordingMode, status: MetadataStatus) -> Self {
        Self {
            recording_mode: Some(mode),
            recording_status: Some(status),
        }
    }

    /// Parse a raw metadata string. Empty metadata means "nothing recorded".
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// Mode currently holding the room, if its status is active.
    pub fn active_mode(&self) -> Option<RecordingMode> {
        match (self.recording_mode, self.recording_status) {
            (Some(mode), Some(status)) if status.is_active() => Some(mode),
            _ => None,
        }
    }
}

/// Options sent with a start request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub transcribe: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StartOptions {
    /// Fill in the language from the user's preference unless one was given.
    pub fn with_default_language(mut self, language: RecordingLanguage) -> Self {
        if self.language.is_none() {
            self.language = language.code().map(str::to_string);
        }
        self
    }
}

/// Role of a participant in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Owner,
    Administrator,
    #[default]
    Member,
}

/// The local participant whose actions are being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity: String,
    pub is_authenticated: bool,
    pub role: RoomRole,
}

impl Actor {
    pub fn new(identity: impl Into<String>, is_authenticated: bool, role: RoomRole) -> Self {
        Self {
            identity: identity.into(),
            is_authenticated,
            role,
        }
    }

    pub fn is_admin_or_owner(&self) -> bool {
        matches!(self.role, RoomRole::Owner | RoomRole::Administrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_mode_wire_names() {
        let json = serde_json::to_string(&RecordingMode::ScreenRecording).unwrap();
        assert_eq!(json, "\"screen_recording\"");
        assert_eq!("screen-recording".parse::<RecordingMode>().unwrap(), RecordingMode::ScreenRecording);
        assert!("video".parse::<RecordingMode>().is_err());
    }

    #[test]
    fn test_metadata_parse_empty_is_default() {
        assert_eq!(SessionMetadata::parse("").unwrap(), SessionMetadata::default());
        assert_eq!(SessionMetadata::parse("  ").unwrap(), SessionMetadata::default());
    }

    #[test]
    fn test_metadata_parse_ignores_unrelated_keys() {
        let metadata =
            SessionMetadata::parse(r#"{"recording_mode":"transcript","recording_status":"started","lobby":true}"#)
                .unwrap();
        assert_eq!(metadata.recording_mode, Some(RecordingMode::Transcript));
        assert_eq!(metadata.recording_status, Some(MetadataStatus::Started));
        assert_eq!(metadata.active_mode(), Some(RecordingMode::Transcript));
    }

    #[test]
    fn test_metadata_unknown_status_is_inactive() {
        let metadata =
            SessionMetadata::parse(r#"{"recording_mode":"transcript","recording_status":"paused"}"#).unwrap();
        assert_eq!(metadata.recording_status, Some(MetadataStatus::Unknown));
        assert_eq!(metadata.active_mode(), None);
    }

    #[test]
    fn test_start_options_language_default() {
        let options = StartOptions::default().with_default_language(RecordingLanguage::French);
        assert_eq!(options.language.as_deref(), Some("fr"));

        let options = StartOptions::default().with_default_language(RecordingLanguage::Automatic);
        assert!(options.language.is_none());

        let options = StartOptions {
            language: Some("en".to_string()),
            transcribe: true,
        }
        .with_default_language(RecordingLanguage::French);
        assert_eq!(options.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_start_options_serialization_skips_defaults() {
        let json = serde_json::to_value(StartOptions::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let json = serde_json::to_value(StartOptions {
            language: None,
            transcribe: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"transcribe": true}));
    }

    #[test]
    fn test_actor_roles() {
        assert!(Actor::new("a", true, RoomRole::Owner).is_admin_or_owner());
        assert!(Actor::new("a", true, RoomRole::Administrator).is_admin_or_owner());
        assert!(!Actor::new("a", true, RoomRole::Member).is_admin_or_owner());
    }
}
