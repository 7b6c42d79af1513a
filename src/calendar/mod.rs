//! Monthly calendar cache: model, expiration rules and refresh.

pub mod cache;
pub mod expiration;
pub mod manager;

pub use cache::{CalendarDays, CalendarMetadata, MonthlyCalendarCache};
pub use expiration::{compute_expiration, should_refresh};
pub use manager::{CalendarCacheManager, RefreshOutcome};
