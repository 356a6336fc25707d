//! Access rules for starting or requesting a recording mode.

use crate::config::{Config, FeaturesConfig, RecordingConfig};

use super::types::{Actor, RecordingMode, RecordingPermission};

/// Pure evaluator over the configured recording surface and feature flags.
///
/// Nothing is cached: every call reads the current inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessPolicy {
    recording: RecordingConfig,
    features: FeaturesConfig,
}

impl AccessPolicy {
    pub fn new(recording: RecordingConfig, features: FeaturesConfig) -> Self {
        Self {
            recording,
            features,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.recording.clone(), config.features.clone())
    }

    /// Whether the actor may start `mode` directly.
    pub fn can_use(&self, mode: RecordingMode, actor: &Actor) -> bool {
        self.is_feature_enabled(mode) && self.has_permission(mode, actor) && self.is_mode_enabled(mode)
    }

    /// Recording is on for the room and the mode is offered.
    pub fn is_mode_enabled(&self, mode: RecordingMode) -> bool {
        self.recording.is_enabled && self.recording.available_modes.contains(&mode)
    }

    /// The mode is usable in this room but the actor lacks the tier for it;
    /// such actors ask an admin instead of starting it themselves.
    pub fn has_feature_without_admin_rights(&self, mode: RecordingMode, actor: &Actor) -> bool {
        self.is_feature_enabled(mode) && self.is_mode_enabled(mode) && !self.has_permission(mode, actor)
    }

    pub fn max_duration(&self) -> Option<std::time::Duration> {
        self.recording.max_duration()
    }

    fn is_feature_enabled(&self, mode: RecordingMode) -> bool {
        !self.features.analytics_enabled || self.features.flag(mode)
    }

    fn has_permission(&self, mode: RecordingMode, actor: &Actor) -> bool {
        match self.recording.permission(mode) {
            RecordingPermission::Authenticated => actor.is_authenticated,
            RecordingPermission::AdminOwner => actor.is_admin_or_owner(),
        }
    }
}
