//! # salat-sources
//!
//! Upstream access for prayer times: the Ministry month page, a remote
//! calculation API, and a local astronomical fallback.
//!
//! ## Design
//!
//! - The Ministry page is scraped with CSS selectors and parsed on the
//!   blocking pool
//! - Calculation API responses are normalised through one tagged union
//! - Every request is bounded by a timeout; failures surface as
//!   [`SourceError`] and never panic
//! - [`Upstream`] is the seam the application mocks in tests
//!
//! ## Security
//!
//! - No credentials are sent anywhere
//! - Page content is treated as untrusted: malformed rows are skipped and
//!   unreadable cells become `N/A`

pub mod astronomy;
pub mod calculation;
pub mod config;
pub mod error;
pub mod http;
pub mod ministry;
pub mod types;
pub mod upstream;

pub use config::{CalculationParams, SourceConfig};
pub use error::{Result, SourceError};
pub use types::{Coordinates, DayTimes, HijriDay, ParsedDay, ParsedMonth, NOT_AVAILABLE};
pub use upstream::{HttpUpstream, Upstream};
