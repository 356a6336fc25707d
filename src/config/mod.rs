use crate::recording::{RecordingLanguage, RecordingMode, RecordingPermission};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const CONFIG_DIR_NAME: &str = "roomrec";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recording: RecordingConfig,
    pub features: FeaturesConfig,
    pub backend: BackendConfig,
    pub notifications: NotificationsConfig,
    pub session: SessionConfig,
}

/// Recording surface as configured by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub is_enabled: bool,
    pub available_modes: Vec<RecordingMode>,
    /// Maximum recording duration in milliseconds, if the backend caps it.
    pub max_duration: Option<u64>,
    pub screen_recording_permission: RecordingPermission,
    pub transcript_permission: RecordingPermission,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            is_enabled: true,
            available_modes: RecordingMode::ALL.to_vec(),
            max_duration: None,
            screen_recording_permission: RecordingPermission::AdminOwner,
            transcript_permission: RecordingPermission::AdminOwner,
        }
    }
}

impl RecordingConfig {
    pub fn permission(&self, mode: RecordingMode) -> RecordingPermission {
        match mode {
            RecordingMode::Transcript => self.transcript_permission,
            RecordingMode::ScreenRecording => self.screen_recording_permission,
        }
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration.map(Duration::from_millis)
    }
}

/// Feature flags gating each recording mode.
///
/// When analytics is disabled no flags are evaluated and every mode is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub analytics_enabled: bool,
    pub transcript: bool,
    pub screen_recording: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            analytics_enabled: false,
            transcript: true,
            screen_recording: true,
        }
    }
}

impl FeaturesConfig {
    pub fn flag(&self, mode: RecordingMode) -> bool {
        match mode {
            RecordingMode::Transcript => self.transcript,
            RecordingMode::ScreenRecording => self.screen_recording,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub api_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8071/api/v1.0".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Broadcasts allowed per window before further sends are dropped.
    pub rate_limit_count: usize,
    pub rate_limit_window_ms: u64,
    /// Minimum time the "saving" notice stays up after a stop.
    pub save_notice_floor_ms: u64,
    /// How long the quick action for a recording request stays visible.
    pub request_display_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            rate_limit_count: 10,
            rate_limit_window_ms: 1000,
            save_notice_floor_ms: 2000,
            request_display_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub language: RecordingLanguage,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// `<config dir>/roomrec/config.toml`, e.g. `~/.config/roomrec/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Unable to determine config directory")?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.recording.is_enabled);
        assert_eq!(config.recording.available_modes.len(), 2);
        assert_eq!(config.notifications.rate_limit_count, 10);
        assert_eq!(config.notifications.save_notice_floor_ms, 2000);
        assert_eq!(config.notifications.request_display_ms, 10_000);
        assert_eq!(config.session.language, RecordingLanguage::French);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [recording]
            available_modes = ["transcript"]
            transcript_permission = "authenticated"
            max_duration = 3600000

            [session]
            language = "auto"
            "#,
        )
        .unwrap();

        assert!(config.recording.is_enabled);
        assert_eq!(config.recording.available_modes, vec![RecordingMode::Transcript]);
        assert_eq!(
            config.recording.permission(RecordingMode::Transcript),
            RecordingPermission::Authenticated
        );
        assert_eq!(
            config.recording.permission(RecordingMode::ScreenRecording),
            RecordingPermission::AdminOwner
        );
        assert_eq!(config.recording.max_duration(), Some(Duration::from_secs(3600)));
        assert_eq!(config.session.language, RecordingLanguage::Automatic);
        assert_eq!(config.backend, BackendConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.features.analytics_enabled = true;
        config.features.screen_recording = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_path_is_app_scoped() {
        if let Ok(path) = Config::config_path() {
            assert!(path.ends_with("roomrec/config.toml"));
        }
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "recording = 12").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
