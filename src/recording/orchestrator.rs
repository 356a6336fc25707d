//! Recording orchestrator.
//!
//! Sequences every recording action of the local participant:
//! access check → backend call → optimistic store update → peer notification.
//! It also owns the handling of incoming peer notifications, the request
//! queue and every timer the session needs.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;

use super::access::AccessPolicy;
use super::backend::{BackendError, RecordingBackend};
use super::error::{RecordingError, ValidationError};
use super::notification::{Delivery, NotificationBus, NotificationKind, NotificationType, RateLimiter};
use super::pending::PendingRequest;
use super::reconciler::MetadataReconciler;
use super::store::{RecordingSessionStore, RecordingState};
use super::timers::{DelayedTasks, TimerKey};
use super::transport::{RoomTransport, TransportEvent};
use super::types::{
    Actor, ErrorDialog, ModeStatus, RecordingLanguage, RecordingMode, SessionMetadata, StartOptions,
};

/// Tunables for one session, usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub language: RecordingLanguage,
    pub save_notice_floor: Duration,
    pub request_display: Duration,
    pub rate_limit_count: usize,
    pub rate_limit_window: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let notifications = &config.notifications;
        Self {
            language: config.session.language,
            save_notice_floor: Duration::from_millis(notifications.save_notice_floor_ms),
            request_display: Duration::from_millis(notifications.request_display_ms),
            rate_limit_count: notifications.rate_limit_count,
            rate_limit_window: Duration::from_millis(notifications.rate_limit_window_ms),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Things UI layers may want to surface as toasts or dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RecordingRequested {
        mode: RecordingMode,
        requester: String,
        pending: usize,
    },
    PeerStarted {
        mode: RecordingMode,
        sender: Option<String>,
    },
    PeerStopped {
        mode: RecordingMode,
        sender: Option<String>,
    },
    LimitReached {
        mode: RecordingMode,
        max_duration: Option<Duration>,
    },
    SaveNoticeShown(RecordingMode),
    SaveNoticeHidden(RecordingMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(SessionMetadata),
    /// Someone else won the race, either reported by the backend or seen in
    /// metadata before the acknowledgement. The next metadata push carries
    /// the state.
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Sent,
    AlreadyRequested,
    NoRecipients,
    Throttled,
}

/// Marks a mode as having a backend call in flight until dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<RecordingMode>>,
    mode: RecordingMode,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.mode);
    }
}

pub struct RecordingOrchestrator {
    room_id: Option<String>,
    actor: RwLock<Actor>,
    policy: RwLock<AccessPolicy>,
    store: RecordingSessionStore,
    reconciler: MetadataReconciler,
    bus: NotificationBus,
    backend: Arc<dyn RecordingBackend>,
    settings: OrchestratorSettings,
    in_flight: Mutex<HashSet<RecordingMode>>,
    /// Modes this participant has asked an admin to start. Entries expire
    /// after the request display time so a lost or dismissed request can be
    /// repeated.
    requested: Arc<Mutex<HashSet<RecordingMode>>>,
    timers: DelayedTasks,
    events: broadcast::Sender<SessionEvent>,
}

impl RecordingOrchestrator {
    pub fn new(
        room_id: Option<String>,
        actor: Actor,
        policy: AccessPolicy,
        transport: Arc<dyn RoomTransport>,
        backend: Arc<dyn RecordingBackend>,
        settings: OrchestratorSettings,
    ) -> Self {
        let store = RecordingSessionStore::new(RecordingState::with_language(settings.language));
        let reconciler = MetadataReconciler::new(store.clone());
        let limiter = RateLimiter::new(settings.rate_limit_count, settings.rate_limit_window);
        let (events, _) = broadcast::channel(64);

        Self {
            room_id: room_id.filter(|id| !id.trim().is_empty()),
            actor: RwLock::new(actor),
            policy: RwLock::new(policy),
            store,
            reconciler,
            bus: NotificationBus::new(transport, limiter),
            backend,
            settings,
            in_flight: Mutex::new(HashSet::new()),
            requested: Arc::new(Mutex::new(HashSet::new())),
            timers: DelayedTasks::new(),
            events,
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn store(&self) -> &RecordingSessionStore {
        &self.store
    }

    pub fn snapshot(&self) -> RecordingState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.store.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Banner key for the room-wide recording indicator.
    pub fn display_key(&self) -> Option<String> {
        self.reconciler.display_key()
    }

    pub fn is_recording(&self) -> bool {
        self.reconciler.is_recording()
    }

    pub fn actor(&self) -> Actor {
        self.actor.read().clone()
    }

    pub fn set_actor(&self, actor: Actor) {
        info!(
            "Local participant {} is now {:?} (authenticated: {})",
            actor.identity, actor.role, actor.is_authenticated
        );
        *self.actor.write() = actor;
    }

    pub fn set_policy(&self, policy: AccessPolicy) {
        *self.policy.write() = policy;
    }

    pub fn can_use(&self, mode: RecordingMode) -> bool {
        self.policy.read().can_use(mode, &self.actor())
    }

    pub fn has_feature_without_admin_rights(&self, mode: RecordingMode) -> bool {
        self.policy
            .read()
            .has_feature_without_admin_rights(mode, &self.actor())
    }

    /// Client-side guard only; the backend has the final word.
    pub fn is_another_mode_started(&self, mode: RecordingMode) -> bool {
        self.store.snapshot().is_another_mode_started(mode)
    }

    pub async fn start(
        &self,
        mode: RecordingMode,
        options: StartOptions,
    ) -> Result<StartOutcome, RecordingError> {
        let room_id = self.require_room_id()?;
        self.require_access(mode)?;

        let state = self.store.snapshot();
        if state.is_another_mode_started(mode) {
            debug!("Rejecting {} start: {} is active", mode, mode.other());
            return Err(ValidationError::AnotherModeActive {
                requested: mode,
                active: mode.other(),
            }
            .into());
        }
        if state.status(mode).is_active() {
            return Err(ValidationError::AlreadyActive(mode).into());
        }

        let _guard = self.begin_start(mode)?;
        let options = options.with_default_language(state.language);

        match self.backend.start_recording(room_id, mode, &options).await {
            Ok(metadata) => {
                info!("{} start acknowledged for room {}", mode, room_id);
                self.reconciler.apply_optimistic(mode, ModeStatus::Starting);
                if !self.store.snapshot().status(mode).is_active() {
                    warn!(
                        "{} start acknowledged but {} holds the room, waiting for metadata",
                        mode,
                        mode.other()
                    );
                    return Ok(StartOutcome::AlreadyStarted);
                }

                self.fulfil_requests(mode);
                self.notify(NotificationType::new(mode, NotificationKind::Started))
                    .await;
                Ok(StartOutcome::Started(metadata))
            }
            Err(BackendError::AlreadyStarted) => {
                info!(
                    "{} already running in room {}, waiting for metadata",
                    mode, room_id
                );
                self.fulfil_requests(mode);
                Ok(StartOutcome::AlreadyStarted)
            }
            Err(e) => {
                error!("Failed to start {}: {}", mode, e);
                self.store.set_error_dialog(Some(ErrorDialog::Start));
                Err(e.into())
            }
        }
    }

    pub async fn stop(&self, mode: RecordingMode) -> Result<SessionMetadata, RecordingError> {
        let room_id = self.require_room_id()?;
        self.require_access(mode)?;

        let status = self.store.snapshot().status(mode);
        if !matches!(status, ModeStatus::Starting | ModeStatus::Started) {
            return Err(ValidationError::NotActive(mode).into());
        }

        let _guard = self.begin(mode)?;
        let requested_at = Instant::now();
        self.show_save_notice(mode);

        match self.backend.stop_recording(room_id).await {
            Ok(metadata) => {
                info!("{} stop acknowledged for room {}", mode, room_id);
                self.reconciler.apply_optimistic(mode, ModeStatus::Stopping);
                self.notify(NotificationType::new(mode, NotificationKind::Stopped))
                    .await;

                let remaining = self
                    .settings
                    .save_notice_floor
                    .saturating_sub(requested_at.elapsed());
                let store = self.store.clone();
                let events = self.events.clone();
                self.timers.schedule(TimerKey::SaveNotice, remaining, async move {
                    hide_save_notice(&store, &events, mode);
                });
                Ok(metadata)
            }
            Err(e) => {
                // Nothing was applied before the call, so the prior status stands.
                error!("Failed to stop {}: {}", mode, e);
                self.timers.cancel(TimerKey::SaveNotice);
                hide_save_notice(&self.store, &self.events, mode);
                self.store.set_error_dialog(Some(ErrorDialog::Stop));
                Err(e.into())
            }
        }
    }

    /// Ask the room's admins to start `mode` on this participant's behalf.
    ///
    /// Only for participants who may not start `mode` themselves.
    pub async fn request_start(&self, mode: RecordingMode) -> Result<RequestOutcome, RecordingError> {
        {
            let actor = self.actor();
            let policy = self.policy.read();
            if policy.can_use(mode, &actor) {
                return Err(ValidationError::RequestNotNeeded(mode).into());
            }
            if !policy.has_feature_without_admin_rights(mode, &actor) {
                return Err(ValidationError::ModeUnavailable(mode).into());
            }
        }
        if self.store.snapshot().status(mode).is_active() {
            return Err(ValidationError::AlreadyActive(mode).into());
        }
        if !self.requested.lock().insert(mode) {
            debug!("{} already requested, waiting for an admin", mode);
            return Ok(RequestOutcome::AlreadyRequested);
        }

        let admins = self.bus.admin_identities();
        if admins.is_empty() {
            warn!("No admin in the room to ask for {}", mode);
            self.requested.lock().remove(&mode);
            return Ok(RequestOutcome::NoRecipients);
        }

        let kind = NotificationType::new(mode, NotificationKind::Requested);
        match self.bus.broadcast(kind, None, Some(&admins)).await {
            Ok(Delivery::Sent) => {
                info!("Requested {} from {} admin(s)", mode, admins.len());
                let requested = Arc::clone(&self.requested);
                self.timers.schedule(
                    TimerKey::RequestCooldown(mode),
                    self.settings.request_display,
                    async move {
                        requested.lock().remove(&mode);
                    },
                );
                Ok(RequestOutcome::Sent)
            }
            Ok(Delivery::Throttled) => {
                self.requested.lock().remove(&mode);
                Ok(RequestOutcome::Throttled)
            }
            Err(e) => {
                self.requested.lock().remove(&mode);
                Err(RecordingError::Notification(e))
            }
        }
    }

    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::DataReceived { payload, sender } => {
                self.handle_data(&payload, sender.as_deref());
            }
            TransportEvent::MetadataChanged(raw) => {
                self.reconciler.on_metadata_changed(&raw);
                if let Some(mode) = self.store.snapshot().active_mode() {
                    self.clear_requested(mode);
                }
            }
            TransportEvent::RecordingIndicatorChanged(recording) => {
                self.reconciler.on_recording_indicator_changed(recording);
            }
            TransportEvent::ParticipantDisconnected(identity) => {
                self.participant_disconnected(&identity);
            }
        }
    }

    /// Handle a data-channel payload. Payloads that are not recording
    /// notifications are ignored.
    pub fn handle_data(&self, payload: &[u8], sender: Option<&str>) {
        let Some(message) = NotificationBus::decode(payload) else {
            return;
        };

        let actor = self.actor();
        if sender == Some(actor.identity.as_str()) {
            return;
        }

        let mode = message.kind.mode();
        match message.kind.kind() {
            NotificationKind::Requested => match sender {
                Some(sender) => self.receive_request(mode, sender, &actor),
                None => debug!("Ignoring {} request without a sender", mode),
            },
            NotificationKind::Started => {
                info!("{} started by {:?}", mode, sender);
                self.fulfil_requests(mode);
                self.emit(SessionEvent::PeerStarted {
                    mode,
                    sender: sender.map(str::to_string),
                });
            }
            NotificationKind::Stopped => {
                info!("{} stopped by {:?}", mode, sender);
                self.emit(SessionEvent::PeerStopped {
                    mode,
                    sender: sender.map(str::to_string),
                });
            }
            NotificationKind::LimitReached => {
                warn!("{} reached its maximum duration", mode);
                self.store.set_limit_reached(Some(mode));
                self.emit(SessionEvent::LimitReached {
                    mode,
                    max_duration: self.policy.read().max_duration(),
                });
            }
        }
    }

    /// Forget requests from a participant who left the room.
    pub fn participant_disconnected(&self, identity: &str) {
        let mut removed = 0;
        let mut collapsed = false;
        self.store.modify(|state| {
            removed = state.pending.remove_identity(identity);
            if let Some(mode) = state.quick_action {
                if state.pending.is_empty(mode) {
                    state.quick_action = None;
                    collapsed = true;
                }
            }
        });

        if collapsed {
            self.timers.cancel(TimerKey::RequestQuickAction);
        }
        if removed > 0 {
            info!("Dropped {} pending request(s) from {}", removed, identity);
        }
    }

    /// Dismiss the oldest request for `mode`.
    pub fn dismiss_request(&self, mode: RecordingMode) -> Option<PendingRequest> {
        let mut dismissed = None;
        self.store.modify(|state| {
            dismissed = state.pending.dismiss_first(mode);
            state.quick_action = None;
        });
        self.timers.cancel(TimerKey::RequestQuickAction);
        dismissed
    }

    pub fn dismiss_error(&self) {
        self.store.set_error_dialog(None);
    }

    pub fn dismiss_limit_alert(&self) {
        self.store.set_limit_reached(None);
    }

    pub fn set_language(&self, language: RecordingLanguage) {
        self.store.set_language(language);
    }

    /// Cancel every timer and forget rate-limit history.
    pub fn shutdown(&self) {
        self.timers.cancel_all();
        self.bus.reset();
        self.requested.lock().clear();
        debug!("Recording orchestrator shut down");
    }

    fn require_room_id(&self) -> Result<&str, ValidationError> {
        self.room_id.as_deref().ok_or_else(|| {
            warn!("No room id for this session");
            ValidationError::MissingRoomId
        })
    }

    fn require_access(&self, mode: RecordingMode) -> Result<(), ValidationError> {
        let actor = self.actor();
        if self.policy.read().can_use(mode, &actor) {
            Ok(())
        } else {
            debug!("{} is not allowed to use {}", actor.identity, mode);
            Err(ValidationError::AccessDenied(mode))
        }
    }

    fn begin(&self, mode: RecordingMode) -> Result<InFlightGuard<'_>, RecordingError> {
        if !self.in_flight.lock().insert(mode) {
            warn!("{} already has a backend call in flight", mode);
            return Err(RecordingError::Busy(mode));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            mode,
        })
    }

    /// Like `begin`, but also refuses while the other mode has a call in
    /// flight: only one mode may hold the room.
    fn begin_start(&self, mode: RecordingMode) -> Result<InFlightGuard<'_>, RecordingError> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains(&mode.other()) {
            warn!("Rejecting {} start: {} has a backend call in flight", mode, mode.other());
            return Err(RecordingError::Busy(mode.other()));
        }
        if !in_flight.insert(mode) {
            warn!("{} already has a backend call in flight", mode);
            return Err(RecordingError::Busy(mode));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            mode,
        })
    }

    fn clear_requested(&self, mode: RecordingMode) {
        self.requested.lock().remove(&mode);
        self.timers.cancel(TimerKey::RequestCooldown(mode));
    }

    fn receive_request(&self, mode: RecordingMode, requester: &str, actor: &Actor) {
        if !actor.is_admin_or_owner() {
            debug!("Ignoring {} request from {}: not an admin", mode, requester);
            return;
        }

        let mut inserted = false;
        let mut first = false;
        let mut pending = 0;
        self.store.modify(|state| {
            inserted = state.pending.insert(mode, requester, Utc::now());
            pending = state.pending.len(mode);
            if !inserted {
                return;
            }
            first = pending == 1;
            if first {
                state.quick_action = Some(mode);
            } else if state.quick_action == Some(mode) {
                state.quick_action = None;
            }
        });

        if !inserted {
            debug!("Duplicate {} request from {}", mode, requester);
            return;
        }

        if first {
            let store = self.store.clone();
            self.timers
                .schedule(TimerKey::RequestQuickAction, self.settings.request_display, async move {
                    collapse_quick_action(&store, mode);
                });
        } else {
            self.timers.cancel(TimerKey::RequestQuickAction);
        }

        info!("{} requested {} ({} pending)", requester, mode, pending);
        self.emit(SessionEvent::RecordingRequested {
            mode,
            requester: requester.to_string(),
            pending,
        });
    }

    /// The mode is being started: every request for it is answered.
    fn fulfil_requests(&self, mode: RecordingMode) {
        self.clear_requested(mode);

        let mut cleared = 0;
        let mut collapsed = false;
        self.store.modify(|state| {
            cleared = state.pending.clear(mode);
            if state.quick_action == Some(mode) {
                state.quick_action = None;
                collapsed = true;
            }
        });

        if collapsed {
            self.timers.cancel(TimerKey::RequestQuickAction);
        }
        if cleared > 0 {
            info!("Cleared {} pending {} request(s)", cleared, mode);
        }
    }

    fn show_save_notice(&self, mode: RecordingMode) {
        self.store.set_save_notice(Some(mode));
        self.emit(SessionEvent::SaveNoticeShown(mode));
    }

    async fn notify(&self, kind: NotificationType) {
        match self.bus.broadcast(kind, None, None).await {
            Ok(Delivery::Sent) => {}
            Ok(Delivery::Throttled) => warn!("Participants not notified of {:?}: rate limited", kind),
            Err(e) => warn!("Failed to notify participants of {:?}: {}", kind, e),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn hide_save_notice(
    store: &RecordingSessionStore,
    events: &broadcast::Sender<SessionEvent>,
    mode: RecordingMode,
) {
    let hidden = store.modify(|state| {
        if state.save_notice == Some(mode) {
            state.save_notice = None;
        }
    });
    if hidden {
        let _ = events.send(SessionEvent::SaveNoticeHidden(mode));
    }
}

fn collapse_quick_action(store: &RecordingSessionStore, mode: RecordingMode) {
    store.modify(|state| {
        if state.quick_action == Some(mode) {
            state.quick_action = None;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.notifications.save_notice_floor_ms = 500;
        config.session.language = RecordingLanguage::English;

        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.save_notice_floor, Duration::from_millis(500));
        assert_eq!(settings.request_display, Duration::from_secs(10));
        assert_eq!(settings.rate_limit_count, 10);
        assert_eq!(settings.rate_limit_window, Duration::from_secs(1));
        assert_eq!(settings.language, RecordingLanguage::English);
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let in_flight = Mutex::new(HashSet::new());
        in_flight.lock().insert(RecordingMode::Transcript);
        {
            let _guard = InFlightGuard {
                in_flight: &in_flight,
                mode: RecordingMode::Transcript,
            };
        }
        assert!(in_flight.lock().is_empty());
    }
}
