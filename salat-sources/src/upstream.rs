//! Trait seam between the resolver and the network.
//!
//! The application holds an `Arc<dyn Upstream>` so tests can swap in a
//! scripted implementation without touching HTTP.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::types::{Coordinates, DayTimes, ParsedMonth};

/// Remote providers of prayer times.
///
/// Implementations must be `Send + Sync`; they are shared between the
/// foreground service and background jobs.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch and parse the Ministry month containing `today` for `city_id`.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`]; callers treat every variant as "tier failed".
    async fn fetch_ministry_month(
        &self,
        city_id: u32,
        today: NaiveDate,
    ) -> Result<ParsedMonth, SourceError>;

    /// Fetch calculated times for `date` at `coords`.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`].
    async fn fetch_calculated_day(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<DayTimes, SourceError>;
}

/// [`Upstream`] backed by real HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    config: SourceConfig,
}

impl HttpUpstream {
    /// Validate `config` and build the shared client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] for an invalid config, or
    /// [`SourceError::Http`] if the client cannot be built.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        config.validate()?;
        let client = crate::http::build_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch_ministry_month(
        &self,
        city_id: u32,
        today: NaiveDate,
    ) -> Result<ParsedMonth, SourceError> {
        crate::ministry::fetch_month(&self.client, &self.config, city_id, today).await
    }

    async fn fetch_calculated_day(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<DayTimes, SourceError> {
        crate::calculation::fetch_day(&self.client, &self.config, coords, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected() {
        let config = SourceConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            HttpUpstream::new(config),
            Err(SourceError::Config(_))
        ));
    }

    #[test]
    fn upstream_is_object_safe() {
        fn assert_dyn(_: &dyn Upstream) {}
        let upstream = HttpUpstream::new(SourceConfig::default()).unwrap();
        assert_dyn(&upstream);
        assert_eq!(upstream.config().timeout_seconds, 10);
    }
}
