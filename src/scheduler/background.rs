//! Registration of the two recurring prayer jobs.
//!
//! Registration is guarded by the persisted `backgroundTasksInitialized`
//! flag. The job API has no cheap "already registered with these
//! parameters" query, so the flag alone decides whether to register.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, SalatError};
use crate::scheduler::runner::JobRunner;
use crate::scheduler::tasks::{JobInput, JobRegistration};
use crate::store::{KeyValueStore, StoreExt, keys};

/// Full fetch, notify and publish pipeline, once a day.
pub const DAILY_JOB: &str = "daily_prayer_refresh";

/// Daily poll that refreshes the monthly calendar only once it has expired.
pub const MONTHLY_JOB: &str = "monthly_calendar_refresh";

/// Tag shared by both jobs.
pub const PRAYER_JOBS_TAG: &str = "prayer_refresh";

pub struct BackgroundScheduler {
    store: Arc<dyn KeyValueStore>,
    daily_at: NaiveTime,
}

impl BackgroundScheduler {
    /// `daily_hour`/`daily_minute` is the local target time of the daily job.
    ///
    /// # Errors
    ///
    /// [`SalatError::Config`] for an impossible time of day.
    pub fn new(store: Arc<dyn KeyValueStore>, daily_hour: u32, daily_minute: u32) -> Result<Self> {
        let daily_at = NaiveTime::from_hms_opt(daily_hour, daily_minute, 0).ok_or_else(|| {
            SalatError::Config(format!(
                "invalid daily refresh time {daily_hour:02}:{daily_minute:02}"
            ))
        })?;
        Ok(Self { store, daily_at })
    }

    /// Register both jobs unless the flag says they already are.
    ///
    /// Returns `true` when registration happened on this call.
    pub async fn register_once(
        &self,
        runner: &mut JobRunner,
        city_id: u32,
        now: NaiveDateTime,
    ) -> Result<bool> {
        if self
            .store
            .get_bool(keys::BACKGROUND_TASKS_INITIALIZED)
            .await?
            .unwrap_or(false)
        {
            debug!("background jobs already registered");
            return Ok(false);
        }

        runner.register(self.daily_job(city_id, now)).await?;
        runner.register(monthly_job(city_id, now)).await?;
        self.store
            .set_bool(keys::BACKGROUND_TASKS_INITIALIZED, true)
            .await?;
        info!(city_id, "background jobs registered");
        Ok(true)
    }

    /// Cancel both jobs and clear the flag.
    pub async fn cancel_all(&self, runner: &mut JobRunner) -> Result<()> {
        runner.cancel_by_tag(PRAYER_JOBS_TAG).await?;
        self.store
            .set_bool(keys::BACKGROUND_TASKS_INITIALIZED, false)
            .await?;
        info!("background jobs cancelled");
        Ok(())
    }

    /// Cancel, then register again. Used for explicit resets and city changes.
    pub async fn reset(
        &self,
        runner: &mut JobRunner,
        city_id: u32,
        now: NaiveDateTime,
    ) -> Result<()> {
        self.cancel_all(runner).await?;
        self.register_once(runner, city_id, now).await?;
        Ok(())
    }

    /// Delay from `now` to the next occurrence of the daily target time:
    /// today if still ahead, otherwise tomorrow.
    pub fn initial_delay(&self, now: NaiveDateTime) -> Duration {
        let today = now.date().and_time(self.daily_at);
        let target = if today > now {
            today
        } else {
            today + Duration::days(1)
        };
        target - now
    }

    fn daily_job(&self, city_id: u32, now: NaiveDateTime) -> JobRegistration {
        JobRegistration::new(
            JobInput {
                job_name: DAILY_JOB.to_owned(),
                city_id,
            },
            PRAYER_JOBS_TAG,
            Duration::days(1),
            self.initial_delay(now),
            now,
        )
    }
}

fn monthly_job(city_id: u32, now: NaiveDateTime) -> JobRegistration {
    JobRegistration::new(
        JobInput {
            job_name: MONTHLY_JOB.to_owned(),
            city_id,
        },
        PRAYER_JOBS_TAG,
        Duration::days(1),
        Duration::zero(),
        now,
    )
}
