//! Recurring background jobs.
//!
//! [`background`] registers the daily and monthly jobs once, [`runner`]
//! executes them, [`jobs`] holds their bodies.

pub mod background;
pub mod jobs;
pub mod runner;
pub mod tasks;

pub use background::{BackgroundScheduler, DAILY_JOB, MONTHLY_JOB, PRAYER_JOBS_TAG};
pub use runner::{JobExecutor, JobFuture, JobRunner};
pub use tasks::{BackoffPolicy, JobInput, JobRegistration, JobRunOutcome, JobRunRecord};
