//! Platform notification seam.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tracing::info;

use crate::error::{Result, SalatError};
use crate::notifications::record::NotificationRequest;
use crate::prayer::Prayer;

/// How an alarm is registered with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmMode {
    /// Fires at the exact instant. May need a permission.
    Exact,
    /// May drift, but is allowed to fire while the device idles.
    InexactAllowWhileIdle,
}

/// The platform notification subsystem.
///
/// Scheduling a request whose id is already pending or displayed replaces it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Cancel every pending alert and clear displayed ones.
    async fn cancel_all(&self) -> Result<()>;

    /// Display immediately.
    async fn show_now(&self, request: NotificationRequest) -> Result<()>;

    /// Register an alarm at `request.record.target_time`.
    ///
    /// # Errors
    ///
    /// [`SalatError::Scheduling`] when the platform rejects the mode.
    async fn schedule_at(&self, request: NotificationRequest, mode: AlarmMode) -> Result<()>;
}

/// Sink that only logs. Used by the host binary.
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn cancel_all(&self) -> Result<()> {
        info!("cancel all notifications");
        Ok(())
    }

    async fn show_now(&self, request: NotificationRequest) -> Result<()> {
        info!(id = request.id(), prayer = %request.record.prayer, title = %request.title, "show notification");
        Ok(())
    }

    async fn schedule_at(&self, request: NotificationRequest, mode: AlarmMode) -> Result<()> {
        info!(
            id = request.id(),
            prayer = %request.record.prayer,
            kind = ?request.record.kind,
            at = %request.record.target_time,
            channel = %request.record.channel_id,
            ?mode,
            "schedule notification"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SinkState {
    displayed: BTreeMap<i32, NotificationRequest>,
    pending: BTreeMap<i32, (NotificationRequest, AlarmMode)>,
    reject_exact: bool,
    failing: BTreeSet<Prayer>,
    cancel_calls: usize,
}

/// In-memory sink that simulates delivery over time.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    state: Mutex<SinkState>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject [`AlarmMode::Exact`], as when the permission is missing.
    pub fn reject_exact_alarms(&self, reject: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_exact = reject;
        }
    }

    /// Reject every registration for `prayer`.
    pub fn fail_for(&self, prayer: Prayer) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(prayer);
        }
    }

    pub fn pending(&self) -> Vec<(NotificationRequest, AlarmMode)> {
        self.state
            .lock()
            .map(|s| s.pending.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn displayed(&self) -> Vec<NotificationRequest> {
        self.state
            .lock()
            .map(|s| s.displayed.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().map(|s| s.cancel_calls).unwrap_or(0)
    }

    /// Deliver every pending alarm due at or before `now`, in time order.
    ///
    /// Auto-dismissing alerts replace whatever is displayed under their id
    /// and then disappear.
    pub fn advance_to(&self, now: NaiveDateTime) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let mut due: Vec<(NotificationRequest, AlarmMode)> = Vec::new();
        state.pending.retain(|_, (request, mode)| {
            if request.record.target_time <= now {
                due.push((request.clone(), *mode));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(request, _)| request.record.target_time);
        for (request, _) in due {
            if request.auto_dismiss {
                state.displayed.remove(&request.id());
            } else {
                state.displayed.insert(request.id(), request);
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SinkState>> {
        self.state
            .lock()
            .map_err(|_| SalatError::Scheduling("notification sink lock poisoned".into()))
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn cancel_all(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.cancel_calls += 1;
        state.pending.clear();
        state.displayed.clear();
        Ok(())
    }

    async fn show_now(&self, request: NotificationRequest) -> Result<()> {
        let mut state = self.lock()?;
        if state.failing.contains(&request.record.prayer) {
            return Err(SalatError::Scheduling(format!(
                "display rejected for {}",
                request.record.prayer
            )));
        }
        state.displayed.insert(request.id(), request);
        Ok(())
    }

    async fn schedule_at(&self, request: NotificationRequest, mode: AlarmMode) -> Result<()> {
        let mut state = self.lock()?;
        if state.failing.contains(&request.record.prayer) {
            return Err(SalatError::Scheduling(format!(
                "alarm rejected for {}",
                request.record.prayer
            )));
        }
        if mode == AlarmMode::Exact && state.reject_exact {
            return Err(SalatError::Scheduling("exact alarms not permitted".into()));
        }
        state.pending.insert(request.id(), (request, mode));
        Ok(())
    }
}
