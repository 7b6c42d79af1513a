//! Job registrations, inputs and run records for the local job runner.
//!
//! A [`JobRegistration`] is the in-process stand-in for a recurring OS job:
//! unique by name, grouped by tag, with a fixed period and a backoff policy
//! applied after failed runs.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Base delay for the first retry after a failed run.
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 15 * 60;

/// Upper bound for the retry delay.
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 5 * 3600;

/// Serializable input handed to a job entry point.
///
/// Everything else a job needs is resolved inside the job body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInput {
    pub job_name: String,
    pub city_id: u32,
}

/// Retry policy after a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// `base * 2^(streak - 1)`, capped at `max_secs`.
    Exponential { base_secs: u64, max_secs: u64 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential {
            base_secs: DEFAULT_BACKOFF_BASE_SECS,
            max_secs: DEFAULT_BACKOFF_MAX_SECS,
        }
    }
}

impl BackoffPolicy {
    /// Retry delay after `failure_streak` consecutive failures.
    pub fn delay(&self, failure_streak: u32) -> Duration {
        match *self {
            Self::Exponential {
                base_secs,
                max_secs,
            } => {
                let shift = failure_streak.saturating_sub(1).min(20);
                let secs = base_secs.saturating_mul(1_u64 << shift).min(max_secs);
                Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            }
        }
    }
}

/// A registered recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRegistration {
    /// Unique job name, also the entry-point selector.
    pub name: String,
    /// Group label used by cancel-by-tag.
    pub tag: String,
    /// Seconds between successful runs.
    pub period_secs: u64,
    /// Delay before the first run, as registered.
    pub initial_delay_secs: u64,
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// When the job is next due (local wall clock).
    pub next_run: NaiveDateTime,
    #[serde(default)]
    pub last_run: Option<NaiveDateTime>,
    #[serde(default)]
    pub failure_streak: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub input: JobInput,
}

impl JobRegistration {
    /// New registration first due `initial_delay` after `now`.
    pub fn new(
        input: JobInput,
        tag: impl Into<String>,
        period: Duration,
        initial_delay: Duration,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            name: input.job_name.clone(),
            tag: tag.into(),
            period_secs: u64::try_from(period.num_seconds()).unwrap_or(0),
            initial_delay_secs: u64::try_from(initial_delay.num_seconds()).unwrap_or(0),
            backoff: BackoffPolicy::default(),
            next_run: now + initial_delay,
            last_run: None,
            failure_streak: 0,
            last_error: None,
            input,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    pub fn period(&self) -> Duration {
        Duration::seconds(i64::try_from(self.period_secs).unwrap_or(i64::MAX))
    }

    /// Reset the failure streak and schedule one period after `started`.
    pub fn mark_run_success(&mut self, started: NaiveDateTime) {
        self.last_run = Some(started);
        self.failure_streak = 0;
        self.last_error = None;
        self.next_run = started + self.period();
    }

    /// Bump the failure streak and retry after the backoff delay, or at
    /// the regular period if that comes sooner.
    pub fn mark_run_failure(&mut self, started: NaiveDateTime, error: &str) {
        self.last_run = Some(started);
        self.failure_streak = self.failure_streak.saturating_add(1);
        self.last_error = Some(error.to_owned());
        let retry = self.backoff.delay(self.failure_streak).min(self.period());
        self.next_run = started + retry;
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRunOutcome {
    Success,
    Failed,
}

/// One entry of run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunRecord {
    pub job_name: String,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub outcome: JobRunOutcome,
    pub summary: String,
}
