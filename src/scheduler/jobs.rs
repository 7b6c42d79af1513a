//! Job entry points.
//!
//! [`execute`] takes only a serializable [`JobInput`] and builds every
//! dependency itself (config, store, HTTP client, sink), so it can be
//! driven by any job host that can hand over a name and a city id.

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info};

use salat_sources::{HttpUpstream, Upstream};

use crate::config::SalatConfig;
use crate::error::{Result, SalatError};
use crate::notifications::{NotificationSink, TracingNotificationSink};
use crate::scheduler::background::{DAILY_JOB, MONTHLY_JOB};
use crate::scheduler::tasks::JobInput;
use crate::service::PrayerService;
use crate::store::{JsonFileStore, KeyValueStore};

/// Everything a job body needs.
pub struct JobContext {
    pub config: SalatConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub upstream: Arc<dyn Upstream>,
    pub sink: Arc<dyn NotificationSink>,
}

impl JobContext {
    /// Build from the default config file and data directory.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid config, or an HTTP client that cannot be built.
    pub fn from_environment() -> Result<Self> {
        let config = SalatConfig::from_file(&SalatConfig::default_config_path())?;
        config.validate()?;
        let upstream = HttpUpstream::new(config.sources.upstream.clone())?;
        Ok(Self {
            config,
            store: Arc::new(JsonFileStore::open_default()),
            upstream: Arc::new(upstream),
            sink: Arc::new(TracingNotificationSink),
        })
    }
}

/// Entry point for every registered job.
pub async fn execute(input: JobInput) -> Result<String> {
    let ctx = JobContext::from_environment()?;
    execute_with(&ctx, input, Local::now().naive_local()).await
}

/// Run the job named in `input` against `ctx` as of `now`.
///
/// # Errors
///
/// [`SalatError::Scheduler`] for an unknown job name, otherwise whatever
/// the pipeline returned. A failed run is retried with backoff.
pub async fn execute_with(ctx: &JobContext, input: JobInput, now: NaiveDateTime) -> Result<String> {
    let mut config = ctx.config.clone();
    config.location.city_id = input.city_id;
    let service = PrayerService::build(
        config,
        ctx.store.clone(),
        ctx.upstream.clone(),
        ctx.sink.clone(),
    )
    .await?;

    match input.job_name.as_str() {
        DAILY_JOB => {
            let snapshot = service.refresh_today(now).await?;
            Ok(format!(
                "loaded {} from {}",
                snapshot.date, snapshot.source_used
            ))
        }
        MONTHLY_JOB => {
            let Some(outcome) = service.calendar().refresh_if_needed(input.city_id, now).await? else {
                debug!(city_id = input.city_id, "monthly refresh not due");
                return Ok("calendar still fresh".to_owned());
            };
            info!(city_id = input.city_id, expiration = %outcome.expiration, "calendar refreshed by job");
            service.refresh_today(now).await?;
            Ok(format!(
                "calendar refreshed, {} days, expires {}",
                outcome.days, outcome.expiration
            ))
        }
        other => Err(SalatError::Scheduler(format!("unknown job: {other}"))),
    }
}
