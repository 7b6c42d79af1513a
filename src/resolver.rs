//! Fallback chain producing today's snapshot.
//!
//! Tiers, in order, each tried only when the previous one produced nothing
//! valid:
//!
//! 1. Monthly cache entry for today (Ministry preference only, no I/O)
//! 2. Per-city daily cache written by an earlier live fetch
//! 3. Live fetch from the preferred source, bounded by a timeout
//! 4. Local sun-position calculation, when coordinates are configured
//!
//! A snapshot without Fajr or Isha never leaves this module.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use salat_sources::{CalculationParams, Coordinates, DayTimes, SourceError, Upstream, astronomy};

use crate::calendar::{CalendarCacheManager, MonthlyCalendarCache};
use crate::config::{SalatConfig, SourcePreference};
use crate::error::{Result, SalatError};
use crate::prayer::{Prayer, PrayerSnapshot, SourceUsed};
use crate::store::{KeyValueStore, StoreExt, keys};

/// Default bound on one live fetch.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(15);

/// What to resolve and how.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub city_id: u32,
    pub preference: SourcePreference,
    pub offline: bool,
    pub coordinates: Option<Coordinates>,
    pub display_location: Option<String>,
    /// Local UTC offset, used only by the local calculation.
    pub utc_offset_hours: f64,
}

impl ResolveRequest {
    /// Build from config, taking the offset from the system time zone.
    pub fn from_config(config: &SalatConfig, preference: SourcePreference, today: NaiveDate) -> Self {
        Self {
            city_id: config.location.city_id,
            preference,
            offline: config.sources.offline,
            coordinates: config.location.coordinates(),
            display_location: config.location.display_name.clone(),
            utc_offset_hours: local_utc_offset_hours(today),
        }
    }
}

/// UTC offset of the system zone at noon on `date`.
pub fn local_utc_offset_hours(date: NaiveDate) -> f64 {
    use chrono::{Local, Offset, TimeZone};
    date.and_hms_opt(12, 0, 0)
        .and_then(|noon| Local.from_local_datetime(&noon).earliest())
        .map(|dt| f64::from(dt.offset().fix().local_minus_utc()) / 3600.0)
        .unwrap_or(0.0)
}

/// Entry under `daily_prayer_times_{cityId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTimesEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub times: DayTimes,
    pub source_used: SourceUsed,
    /// When the entry was written (local wall clock).
    pub timestamp: NaiveDateTime,
}

pub struct SourceResolver {
    store: Arc<dyn KeyValueStore>,
    upstream: Arc<dyn Upstream>,
    calendar: Arc<CalendarCacheManager>,
    calculation: CalculationParams,
    network_timeout: Duration,
}

impl SourceResolver {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        upstream: Arc<dyn Upstream>,
        calendar: Arc<CalendarCacheManager>,
        calculation: CalculationParams,
    ) -> Self {
        Self {
            store,
            upstream,
            calendar,
            calculation,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Walk the tiers and return the first valid snapshot for `now`'s date.
    ///
    /// # Errors
    ///
    /// [`SalatError::NoValidSource`] when every tier failed.
    pub async fn resolve(&self, req: &ResolveRequest, now: NaiveDateTime) -> Result<PrayerSnapshot> {
        let today = now.date();
        let city_id = req.city_id;

        let monthly = if req.preference == SourcePreference::Ministry {
            match self.calendar.load_on(city_id, today).await {
                Ok(cache) => cache,
                Err(e) => {
                    warn!(city_id, error = %e, "monthly cache read failed");
                    None
                }
            }
        } else {
            None
        };
        let tomorrow_fajr = monthly.as_ref().and_then(|cache| tomorrow_fajr(cache, today));

        if let Some(times) = monthly.as_ref().and_then(|cache| cache.day(today)) {
            if accept(city_id, SourceUsed::MonthlyCache, times) {
                return Ok(self.snapshot(req, today, times.clone(), SourceUsed::MonthlyCache, tomorrow_fajr));
            }
        }

        if let Some(entry) = self.read_daily(city_id, today).await {
            if accept(city_id, SourceUsed::DailyCache, &entry.times) {
                return Ok(self.snapshot(req, today, entry.times, SourceUsed::DailyCache, tomorrow_fajr));
            }
        }

        if req.offline {
            debug!(city_id, "offline mode, skipping live fetch");
        } else {
            match self.fetch_live(req, today).await {
                Ok((times, source)) if accept(city_id, source, &times) => {
                    self.write_daily(city_id, today, &times, source, now).await;
                    return Ok(self.snapshot(req, today, times, source, tomorrow_fajr));
                }
                Ok(_) => {}
                Err(e) => warn!(city_id, source = req.preference.as_str(), error = %e, "live fetch failed"),
            }
        }

        if let Some(coords) = req.coordinates {
            let times = astronomy::compute_day(coords, today, req.utc_offset_hours, &self.calculation);
            if accept(city_id, SourceUsed::Local, &times) {
                let next = today.succ_opt().map(|tomorrow| {
                    astronomy::compute_day(coords, tomorrow, req.utc_offset_hours, &self.calculation).fajr
                });
                return Ok(self.snapshot(req, today, times, SourceUsed::Local, next));
            }
        }

        Err(SalatError::NoValidSource(format!(
            "no tier produced valid times for city {city_id} on {today}"
        )))
    }

    fn snapshot(
        &self,
        req: &ResolveRequest,
        date: NaiveDate,
        times: DayTimes,
        source: SourceUsed,
        tomorrow_fajr: Option<String>,
    ) -> PrayerSnapshot {
        info!(city_id = req.city_id, tier = %source, %date, "prayer times resolved");
        let mut snapshot = PrayerSnapshot::new(date, times, source);
        snapshot.display_location = req.display_location.clone();
        snapshot.tomorrow_fajr = tomorrow_fajr.filter(|t| crate::prayer::parse_hhmm(t).is_some());
        snapshot
    }

    async fn fetch_live(&self, req: &ResolveRequest, today: NaiveDate) -> Result<(DayTimes, SourceUsed)> {
        match req.preference {
            SourcePreference::Ministry => {
                let month = self
                    .bounded(self.upstream.fetch_ministry_month(req.city_id, today))
                    .await?;
                let cache = MonthlyCalendarCache::from_parsed(req.city_id, &month, today)?;
                let times = cache.day(today).cloned().ok_or_else(|| {
                    SalatError::from(SourceError::Unavailable(format!("no ministry row for {today}")))
                })?;
                Ok((times, SourceUsed::Ministry))
            }
            SourcePreference::Calculation => {
                let coords = req.coordinates.ok_or_else(|| {
                    SalatError::Config("calculation source needs coordinates".into())
                })?;
                let times = self
                    .bounded(self.upstream.fetch_calculated_day(coords, today))
                    .await?;
                Ok((times, SourceUsed::Calculation))
            }
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = std::result::Result<T, SourceError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.network_timeout, fut).await {
            Ok(result) => result.map_err(SalatError::from),
            Err(_) => Err(SalatError::Network(SourceError::Timeout(format!(
                "no answer within {}ms",
                self.network_timeout.as_millis()
            )))),
        }
    }

    async fn read_daily(&self, city_id: u32, today: NaiveDate) -> Option<DailyTimesEntry> {
        let key = keys::daily_times(city_id);
        match self.store.get_json::<DailyTimesEntry>(&key).await {
            Ok(Some(entry)) if entry.date == today => Some(entry),
            Ok(_) => None,
            Err(SalatError::CacheCorruption(e)) => {
                warn!(city_id, error = %e, "daily cache unreadable, discarding");
                if let Err(e) = self.store.remove(&key).await {
                    warn!(city_id, error = %e, "could not discard daily cache");
                }
                None
            }
            Err(e) => {
                warn!(city_id, error = %e, "daily cache read failed");
                None
            }
        }
    }

    async fn write_daily(
        &self,
        city_id: u32,
        date: NaiveDate,
        times: &DayTimes,
        source_used: SourceUsed,
        now: NaiveDateTime,
    ) {
        let entry = DailyTimesEntry {
            date,
            times: times.clone(),
            source_used,
            timestamp: now,
        };
        if let Err(e) = self.store.set_json(&keys::daily_times(city_id), &entry).await {
            warn!(city_id, error = %e, "could not write daily cache");
        }
    }
}

fn accept(city_id: u32, tier: SourceUsed, times: &DayTimes) -> bool {
    if times.is_valid() {
        return true;
    }
    warn!(city_id, %tier, fajr = %times.fajr, isha = %times.isha, "rejecting snapshot without fajr or isha");
    false
}

fn tomorrow_fajr(cache: &MonthlyCalendarCache, today: NaiveDate) -> Option<String> {
    let tomorrow = today.succ_opt()?;
    cache
        .day(tomorrow)
        .map(|times| Prayer::Fajr.time_in(times).to_owned())
}
