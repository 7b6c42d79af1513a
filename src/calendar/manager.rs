//! Owns the per-city monthly cache in the store.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use salat_sources::{SourceError, Upstream};

use super::cache::MonthlyCalendarCache;
use super::expiration;
use crate::error::{Result, SalatError};
use crate::store::{KeyValueStore, StoreExt, keys};

/// Upper bound on one month fetch, including parsing.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub expiration: NaiveDate,
    pub days: usize,
    /// Whether a previous cache was kept under the `_previous` key.
    pub backed_up: bool,
}

pub struct CalendarCacheManager {
    store: Arc<dyn KeyValueStore>,
    upstream: Arc<dyn Upstream>,
    fetch_timeout: Duration,
}

impl CalendarCacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            store,
            upstream,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Load the city's cache. A corrupt entry is deleted and reported as absent.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn load(&self, city_id: u32) -> Result<Option<MonthlyCalendarCache>> {
        let Some(raw) = self.store.get(&keys::calendar(city_id)).await? else {
            return Ok(None);
        };
        match MonthlyCalendarCache::from_json_str(&raw) {
            Ok(cache) => Ok(Some(cache)),
            Err(e) => {
                warn!(city_id, error = %e, "monthly cache unreadable, discarding");
                self.invalidate(city_id).await?;
                Ok(None)
            }
        }
    }

    /// Load the city's cache as seen on `today`.
    ///
    /// A legacy Hijri cache read for the first time is pinned to `today` and
    /// written back, so later reads map dates and expire from the same day 1.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn load_on(
        &self,
        city_id: u32,
        today: NaiveDate,
    ) -> Result<Option<MonthlyCalendarCache>> {
        let Some(mut cache) = self.load(city_id).await? else {
            return Ok(None);
        };
        if cache.anchor_legacy(today) {
            info!(city_id, first_date = ?cache.meta.first_date, "anchored legacy hijri calendar");
            self.store.set_json(&keys::calendar(city_id), &cache).await?;
        }
        Ok(Some(cache))
    }

    /// The backup taken before the last replacement, if readable.
    pub async fn load_previous(&self, city_id: u32) -> Result<Option<MonthlyCalendarCache>> {
        match self
            .store
            .get_json::<MonthlyCalendarCache>(&keys::calendar_previous(city_id))
            .await
        {
            Ok(cache) => Ok(cache),
            Err(SalatError::CacheCorruption(e)) => {
                warn!(city_id, error = %e, "previous monthly cache unreadable, discarding");
                self.store.remove(&keys::calendar_previous(city_id)).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether a failed refresh left the city flagged.
    pub async fn needs_refresh_flag(&self, city_id: u32) -> Result<bool> {
        match self
            .store
            .get_bool(&keys::calendar_needs_refresh(city_id))
            .await
        {
            Ok(flag) => Ok(flag.unwrap_or(false)),
            Err(SalatError::CacheCorruption(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Refresh decision for a city at `now`.
    pub async fn should_refresh(&self, city_id: u32, now: NaiveDateTime) -> Result<bool> {
        if self.needs_refresh_flag(city_id).await? {
            return Ok(true);
        }
        let cache = self.load_on(city_id, now.date()).await?;
        Ok(expiration::should_refresh(cache.as_ref(), now))
    }

    /// Fetch, parse and replace the city's month.
    ///
    /// The previous cache, when readable, is kept under the backup key. On
    /// any failure the cache is deleted and the city flagged for refresh.
    ///
    /// # Errors
    ///
    /// The fetch or parse error that caused the failure.
    pub async fn refresh(&self, city_id: u32, now: NaiveDateTime) -> Result<RefreshOutcome> {
        let key = keys::calendar(city_id);
        let previous = match self.store.get(&key).await? {
            Some(raw) => match MonthlyCalendarCache::from_json_str(&raw) {
                Ok(_) => Some(raw),
                Err(e) => {
                    warn!(city_id, error = %e, "existing monthly cache unreadable, discarding");
                    self.invalidate(city_id).await?;
                    None
                }
            },
            None => None,
        };

        let today = now.date();
        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.upstream.fetch_ministry_month(city_id, today),
        )
        .await;
        let month = match fetched {
            Ok(Ok(month)) => month,
            Ok(Err(e)) => return Err(self.fail(city_id, e.into()).await),
            Err(_) => {
                let e = SourceError::Timeout(format!(
                    "monthly fetch exceeded {}s",
                    self.fetch_timeout.as_secs()
                ));
                return Err(self.fail(city_id, e.into()).await);
            }
        };

        let mut cache = match MonthlyCalendarCache::from_parsed(city_id, &month, today) {
            Ok(cache) => cache,
            Err(e) => return Err(self.fail(city_id, e).await),
        };
        let expiration = expiration::expiration_after_refresh(&cache, now);
        cache.meta.expires_at = Some(expiration);

        let backed_up = match previous {
            Some(raw) => {
                self.store.set(&keys::calendar_previous(city_id), raw).await?;
                true
            }
            None => false,
        };
        self.store.set_json(&key, &cache).await?;
        self.store
            .set(&keys::monthly_expiration(city_id), expiration.to_string())
            .await?;
        self.store
            .remove(&keys::calendar_needs_refresh(city_id))
            .await?;

        info!(city_id, %expiration, days = cache.days.len(), "monthly cache refreshed");
        Ok(RefreshOutcome {
            expiration,
            days: cache.days.len(),
            backed_up,
        })
    }

    /// Refresh only when [`Self::should_refresh`] says so.
    pub async fn refresh_if_needed(
        &self,
        city_id: u32,
        now: NaiveDateTime,
    ) -> Result<Option<RefreshOutcome>> {
        if !self.should_refresh(city_id, now).await? {
            debug!(city_id, "monthly cache still fresh");
            return Ok(None);
        }
        self.refresh(city_id, now).await.map(Some)
    }

    async fn fail(&self, city_id: u32, err: SalatError) -> SalatError {
        warn!(city_id, error = %err, "monthly refresh failed, invalidating cache");
        if let Err(store_err) = self.invalidate(city_id).await {
            warn!(city_id, error = %store_err, "could not invalidate monthly cache");
        }
        err
    }

    /// Delete the city's cache and expiration, and raise the needs-refresh flag.
    async fn invalidate(&self, city_id: u32) -> Result<()> {
        self.store.remove(&keys::calendar(city_id)).await?;
        self.store.remove(&keys::monthly_expiration(city_id)).await?;
        self.store
            .set_bool(&keys::calendar_needs_refresh(city_id), true)
            .await
    }
}
