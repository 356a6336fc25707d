pub mod access;
pub mod backend;
pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod pending;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod timers;
pub mod transport;
pub mod types;

pub use access::AccessPolicy;
pub use backend::{BackendError, HttpRecordingBackend, RecordingBackend};
pub use error::{RecordingError, ValidationError};
pub use notification::{
    Delivery, NotificationBus, NotificationKind, NotificationMessage, NotificationType, RateLimiter,
};
pub use orchestrator::{
    OrchestratorSettings, RecordingOrchestrator, RequestOutcome, SessionEvent, StartOutcome,
};
pub use pending::{PendingRequest, PendingRequests};
pub use reconciler::{derive_status, display_key, MetadataReconciler};
pub use session::RecordingSession;
pub use store::{CanonicalStatus, ModeStatuses, RecordingSessionStore, RecordingState};
pub use transport::{RoomTransport, SendOptions, TransportEvent};
pub use types::{
    Actor, ErrorDialog, MetadataStatus, ModeStatus, RecordingLanguage, RecordingMode,
    RecordingPermission, RoomRole, SessionMetadata, StartOptions,
};
