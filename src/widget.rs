//! Denormalized snapshot for the home-screen widget.
//!
//! Publishing never fails from the caller's point of view: errors are
//! logged and dropped. The widget applies its own freshness window to
//! `cacheTimestamp`, independent of every other cache.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use salat_sources::DayTimes;

use crate::prayer::{PrayerSnapshot, SourceUsed};
use crate::settings::Appearance;
use crate::store::{KeyValueStore, StoreExt, keys};

/// Default freshness window.
pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

/// Blob stored under `widgetPrayerData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPayload {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub times: DayTimes,
    pub source_used: SourceUsed,
    #[serde(default)]
    pub display_location: Option<String>,
    pub theme_hue: f64,
    pub is_dark_mode: bool,
    pub bg_opacity: f64,
    pub cache_timestamp: NaiveDateTime,
}

impl WidgetPayload {
    pub fn new(snapshot: &PrayerSnapshot, appearance: &Appearance, now: NaiveDateTime) -> Self {
        Self {
            date: snapshot.date,
            times: snapshot.times.clone(),
            source_used: snapshot.source_used,
            display_location: snapshot.display_location.clone(),
            theme_hue: appearance.theme_hue,
            is_dark_mode: appearance.is_dark_mode,
            bg_opacity: appearance.bg_opacity,
            cache_timestamp: now,
        }
    }

    /// Fresh while `now` is within `window` of the write.
    pub fn is_fresh(&self, now: NaiveDateTime, window: Duration) -> bool {
        now >= self.cache_timestamp && now - self.cache_timestamp < window
    }
}

pub struct WidgetCacheBridge {
    store: Arc<dyn KeyValueStore>,
    freshness: Duration,
}

impl WidgetCacheBridge {
    pub fn new(store: Arc<dyn KeyValueStore>, freshness_hours: i64) -> Self {
        Self {
            store,
            freshness: Duration::hours(freshness_hours.max(1)),
        }
    }

    /// Replace the widget blob. Fire-and-forget.
    pub async fn publish(&self, snapshot: &PrayerSnapshot, appearance: &Appearance, now: NaiveDateTime) {
        let payload = WidgetPayload::new(snapshot, appearance, now);
        match self.store.set_json(keys::WIDGET_PRAYER_DATA, &payload).await {
            Ok(()) => debug!(date = %payload.date, source = %payload.source_used, "widget data published"),
            Err(e) => warn!(error = %e, "widget publish failed"),
        }
    }

    /// The stored blob if it is still inside the freshness window.
    pub async fn read_fresh(&self, now: NaiveDateTime) -> Option<WidgetPayload> {
        let payload = match self
            .store
            .get_json::<WidgetPayload>(keys::WIDGET_PRAYER_DATA)
            .await
        {
            Ok(payload) => payload?,
            Err(e) => {
                warn!(error = %e, "widget data unreadable");
                return None;
            }
        };
        payload.is_fresh(now, self.freshness).then_some(payload)
    }
}
