//! Salat: prayer times with a cached monthly calendar, a tiered source
//! fallback and notification scheduling.
//!
//! # Architecture
//!
//! Data moves in one direction:
//!
//! - **Calendar**: fetches the Ministry month for a city, stores it whole
//!   and decides when it has expired ([`calendar`])
//! - **Resolver**: produces today's [`prayer::PrayerSnapshot`] from the
//!   monthly cache, the daily cache, a live fetch or a local calculation
//!   ([`resolver`])
//! - **Notifications**: tear down and rebuild every alert from a snapshot
//!   ([`notifications`])
//! - **Widget**: publishes the snapshot for an external display ([`widget`])
//!
//! [`scheduler`] drives the pipeline from recurring jobs, and
//! [`service::PrayerService`] drives it from the foreground. Upstream
//! access lives in the `salat-sources` crate.

pub mod calendar;
pub mod config;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod prayer;
pub mod resolver;
pub mod salat_dirs;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod store;
pub mod widget;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::SalatConfig;
pub use error::{Result, SalatError};
pub use prayer::{Prayer, PrayerSnapshot, SourceUsed};
pub use salat_sources::{HttpUpstream, Upstream};
pub use service::PrayerService;
