//! Notification settings, records and the scheduling orchestrator.

pub mod orchestrator;
pub mod record;
pub mod sink;
pub mod state;

pub use orchestrator::{NotificationOrchestrator, ScheduleReport};
pub use record::{NotificationKind, NotificationRequest, ScheduledNotificationRecord};
pub use sink::{AlarmMode, MemoryNotificationSink, NotificationSink, TracingNotificationSink};
pub use state::{NotificationConfig, NotificationState, StateConfig};
