//! Local job runner loop.
//!
//! Holds registered jobs and run history, persisted under the
//! `backgroundJobs` key, and executes due jobs on each tick. Cancellation
//! is coarse: a token stops the loop between ticks, and a running job is
//! always allowed to finish.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SalatError};
use crate::scheduler::tasks::{JobInput, JobRegistration, JobRunOutcome, JobRunRecord};
use crate::store::{KeyValueStore, StoreExt, keys};

/// Number of run-history entries to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Boxed future returned by a job entry point.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Callback that runs a job body for a given input.
pub type JobExecutor = Arc<dyn Fn(JobInput) -> JobFuture + Send + Sync>;

/// Persisted runner state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RunnerState {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    jobs: Vec<JobRegistration>,
    #[serde(default)]
    history: Vec<JobRunRecord>,
}

fn default_state_version() -> u8 {
    1
}

pub struct JobRunner {
    store: Arc<dyn KeyValueStore>,
    jobs: Vec<JobRegistration>,
    history: Vec<JobRunRecord>,
    executor: JobExecutor,
    max_history_entries: usize,
}

impl JobRunner {
    /// Load persisted registrations. An unreadable entry is deleted and the
    /// runner starts empty.
    ///
    /// # Errors
    ///
    /// Store failures other than a corrupt entry.
    pub async fn load(store: Arc<dyn KeyValueStore>, executor: JobExecutor) -> Result<Self> {
        let state = match store.get_json::<RunnerState>(keys::BACKGROUND_JOBS).await {
            Ok(state) => state.unwrap_or_default(),
            Err(SalatError::CacheCorruption(e)) => {
                warn!("discarding unreadable job state: {e}");
                store.remove(keys::BACKGROUND_JOBS).await?;
                RunnerState::default()
            }
            Err(e) => return Err(e),
        };
        debug!(jobs = state.jobs.len(), "loaded job runner state");

        let mut runner = Self {
            store,
            jobs: state.jobs,
            history: state.history,
            executor,
            max_history_entries: DEFAULT_HISTORY_LIMIT,
        };
        runner.trim_history();
        Ok(runner)
    }

    /// Override the run-history limit.
    pub fn with_history_limit(mut self, max_entries: usize) -> Self {
        self.max_history_entries = max_entries.max(1);
        self.trim_history();
        self
    }

    pub fn jobs(&self) -> &[JobRegistration] {
        &self.jobs
    }

    pub fn history(&self) -> &[JobRunRecord] {
        &self.history
    }

    pub fn job(&self, name: &str) -> Option<&JobRegistration> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Register a job, replacing any job with the same name.
    ///
    /// Returns `true` when the name was new.
    pub async fn register(&mut self, job: JobRegistration) -> Result<bool> {
        info!(job = %job.name, next_run = %job.next_run, "registering job");
        let added = match self.jobs.iter_mut().find(|j| j.name == job.name) {
            Some(existing) => {
                *existing = job;
                false
            }
            None => {
                self.jobs.push(job);
                true
            }
        };
        self.save_state().await?;
        Ok(added)
    }

    /// Remove every job carrying `tag`. Returns how many were removed.
    pub async fn cancel_by_tag(&mut self, tag: &str) -> Result<usize> {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.tag != tag);
        let removed = before - self.jobs.len();
        if removed > 0 {
            info!(tag, removed, "cancelled jobs");
        }
        self.save_state().await?;
        Ok(removed)
    }

    /// Run every job due at `now`, one after another. Returns the number run.
    ///
    /// Job failures are recorded and rescheduled with backoff; they are not
    /// returned as errors.
    ///
    /// # Errors
    ///
    /// Only when the updated state cannot be persisted.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Result<usize> {
        let due: Vec<JobInput> = self
            .jobs
            .iter()
            .filter(|j| j.is_due(now))
            .map(|j| j.input.clone())
            .collect();
        if due.is_empty() {
            return Ok(0);
        }

        for input in &due {
            let name = input.job_name.clone();
            debug!(job = %name, "executing job");
            let result = (self.executor)(input.clone()).await;
            let finished_at = Local::now().naive_local().max(now);

            let (outcome, summary) = match &result {
                Ok(summary) => (JobRunOutcome::Success, summary.clone()),
                Err(e) => {
                    warn!(job = %name, error = %e, "job failed");
                    (JobRunOutcome::Failed, e.to_string())
                }
            };

            if let Some(job) = self.jobs.iter_mut().find(|j| j.name == name) {
                match outcome {
                    JobRunOutcome::Success => job.mark_run_success(now),
                    JobRunOutcome::Failed => job.mark_run_failure(now, &summary),
                }
            }

            self.push_history(JobRunRecord {
                job_name: name,
                started_at: now,
                finished_at,
                outcome,
                summary,
            });
        }

        self.save_state().await?;
        Ok(due.len())
    }

    /// Spawn the tick loop. It stops when `cancel` fires, but only between
    /// ticks.
    pub fn run(
        mut self,
        tick_interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<Self> {
        tokio::spawn(async move {
            info!("job runner started with {} jobs", self.jobs.len());
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = self.tick(Local::now().naive_local()).await {
                            error!("job runner tick failed: {e}");
                        }
                    }
                }
            }
            info!("job runner stopped");
            self
        })
    }

    fn push_history(&mut self, run: JobRunRecord) {
        self.history.push(run);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        if self.history.len() <= self.max_history_entries {
            return;
        }
        let drop_count = self.history.len() - self.max_history_entries;
        self.history.drain(0..drop_count);
    }

    async fn save_state(&self) -> Result<()> {
        let state = RunnerState {
            version: default_state_version(),
            jobs: self.jobs.clone(),
            history: self.history.clone(),
        };
        self.store.set_json(keys::BACKGROUND_JOBS, &state).await
    }
}
