//! Turns a snapshot and settings into scheduled alerts.
//!
//! Every call tears down all pending alerts and rebuilds them from scratch.
//! Passes are serialized process-wide, across every orchestrator, so the
//! foreground load and the background jobs never interleave a cancel with
//! another pass's registrations.

use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, SalatError};
use crate::notifications::record::{
    NEXT_DAY_FAJR_ID, NotificationKind, NotificationRequest, ScheduledNotificationRecord,
    notification_id,
};
use crate::notifications::sink::{AlarmMode, NotificationSink};
use crate::notifications::state::{NotificationConfig, NotificationState};
use crate::prayer::{Prayer, PrayerSnapshot};

/// What one scheduling pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Records registered or displayed, in registration order.
    pub scheduled: Vec<ScheduledNotificationRecord>,
    /// Prayers whose alarm fell back to inexact mode.
    pub degraded: Vec<Prayer>,
    /// Prayers for which some registration failed outright.
    pub failed: Vec<Prayer>,
    /// The next upcoming prayer, if any.
    pub next_prayer: Option<(Prayer, NaiveDateTime)>,
}

/// Held for the whole of one scheduling pass.
static SCHEDULE_LOCK: Mutex<()> = Mutex::const_new(());

pub struct NotificationOrchestrator {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationOrchestrator {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Rebuild all alerts for `snapshot` as of `now`.
    ///
    /// One prayer's registration failure never stops the others.
    ///
    /// # Errors
    ///
    /// [`SalatError::NoValidSource`] for an invalid snapshot (nothing is
    /// cancelled in that case), or the sink's error if cancel-all fails.
    pub async fn schedule_today(
        &self,
        snapshot: &PrayerSnapshot,
        config: &NotificationConfig,
        now: NaiveDateTime,
    ) -> Result<ScheduleReport> {
        if !snapshot.is_valid() {
            return Err(SalatError::NoValidSource(format!(
                "refusing to schedule from invalid snapshot for {}",
                snapshot.date
            )));
        }

        let _serial = SCHEDULE_LOCK.lock().await;
        self.sink.cancel_all().await?;

        let mut report = ScheduleReport::default();
        for prayer in Prayer::ALL {
            let Some(time) = snapshot.at(prayer) else {
                debug!(%prayer, "no time, skipping");
                continue;
            };
            if time <= now {
                continue;
            }
            if report.next_prayer.is_none() {
                report.next_prayer = Some((prayer, time));
            }

            let state = config.athan_state(prayer);
            if state != NotificationState::Off {
                let request = NotificationRequest::athan(
                    prayer,
                    notification_id(prayer, NotificationKind::Athan),
                    time,
                    state,
                    &config.athan_sound,
                );
                self.register(request, &mut report).await;
            }

            if config.reminder_active(prayer) {
                let lead = Duration::minutes(i64::from(config.reminder_minutes));
                if time - lead > now {
                    self.schedule_reminder(prayer, time, config, &mut report)
                        .await;
                }
            }
        }

        if report.next_prayer.is_none() {
            self.schedule_next_day_fajr(snapshot, config, &mut report)
                .await;
        }

        info!(
            date = %snapshot.date,
            scheduled = report.scheduled.len(),
            degraded = report.degraded.len(),
            failed = report.failed.len(),
            "notifications rescheduled"
        );
        Ok(report)
    }

    /// Countdown now, killer at prayer time under the same id.
    async fn schedule_reminder(
        &self,
        prayer: Prayer,
        time: NaiveDateTime,
        config: &NotificationConfig,
        report: &mut ScheduleReport,
    ) {
        let countdown = NotificationRequest::reminder_countdown(
            prayer,
            time,
            config.reminder_minutes,
            config.reminder_state(prayer),
        );
        let record = countdown.record.clone();
        match self.sink.show_now(countdown).await {
            Ok(()) => report.scheduled.push(record),
            Err(e) => {
                warn!(%prayer, error = %e, "reminder countdown rejected");
                mark(&mut report.failed, prayer);
                return;
            }
        }
        self.register(NotificationRequest::reminder_killer(prayer, time), report)
            .await;
    }

    async fn schedule_next_day_fajr(
        &self,
        snapshot: &PrayerSnapshot,
        config: &NotificationConfig,
        report: &mut ScheduleReport,
    ) {
        let Some(time) = snapshot.next_day_fajr() else {
            return;
        };
        report.next_prayer = Some((Prayer::Fajr, time));
        let state = config.athan_state(Prayer::Fajr);
        if state == NotificationState::Off {
            return;
        }
        let request = NotificationRequest::athan(
            Prayer::Fajr,
            NEXT_DAY_FAJR_ID,
            time,
            state,
            &config.athan_sound,
        );
        self.register(request, report).await;
    }

    /// Exact first, then inexact-while-idle.
    async fn register(&self, request: NotificationRequest, report: &mut ScheduleReport) {
        let prayer = request.record.prayer;
        let record = request.record.clone();
        match self
            .sink
            .schedule_at(request.clone(), AlarmMode::Exact)
            .await
        {
            Ok(()) => report.scheduled.push(record),
            Err(exact_err) => {
                debug!(%prayer, error = %exact_err, "exact alarm rejected, retrying inexact");
                match self
                    .sink
                    .schedule_at(request, AlarmMode::InexactAllowWhileIdle)
                    .await
                {
                    Ok(()) => {
                        mark(&mut report.degraded, prayer);
                        report.scheduled.push(record);
                    }
                    Err(e) => {
                        warn!(%prayer, error = %e, "alarm registration failed");
                        mark(&mut report.failed, prayer);
                    }
                }
            }
        }
    }
}

fn mark(list: &mut Vec<Prayer>, prayer: Prayer) {
    if !list.contains(&prayer) {
        list.push(prayer);
    }
}
