//! Shared helpers for integration tests.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use salat::notifications::MemoryNotificationSink;
use salat::store::{KeyValueStore, MemoryStore};
use salat::{PrayerService, SalatConfig};
use salat_sources::{Coordinates, DayTimes, HijriDay, ParsedDay, ParsedMonth, SourceError, Upstream};

pub(crate) const CITY: u32 = 58;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).expect("valid time")
}

/// Winter times for Rabat; Fajr minute varies so days can be told apart.
pub(crate) fn winter_day(fajr_minute: u32) -> DayTimes {
    DayTimes::from_raw([
        format!("06:{:02}", fajr_minute % 60),
        "08:11".to_owned(),
        "13:19".to_owned(),
        "15:50".to_owned(),
        "18:18".to_owned(),
        "19:39".to_owned(),
    ])
}

fn day_json(times: &DayTimes) -> Value {
    serde_json::to_value(times).expect("times serialize")
}

/// Persisted Gregorian cache with one key per date, no metadata.
pub(crate) fn gregorian_cache_json(start: NaiveDate, len: u64) -> String {
    let mut map = Map::new();
    for offset in 0..len {
        let day = start.checked_add_days(Days::new(offset)).expect("date in range");
        map.insert(day.to_string(), day_json(&winter_day(u32::try_from(offset).unwrap())));
    }
    Value::Object(map).to_string()
}

/// Persisted legacy Hijri cache: `count` numbered days plus `_currentHijriDay`.
pub(crate) fn hijri_cache_json(count: u8, current_day: u8) -> String {
    let mut map = Map::new();
    for day in 1..=count {
        map.insert(day.to_string(), day_json(&winter_day(u32::from(day))));
    }
    map.insert("_currentHijriDay".into(), json!(current_day.to_string()));
    Value::Object(map).to_string()
}

/// A fully dated parsed month of `len` days from `start`.
pub(crate) fn month(start: NaiveDate, len: u64) -> ParsedMonth {
    let days: Vec<ParsedDay> = (0..len)
        .map(|offset| ParsedDay {
            hijri_day: HijriDay::Day(u8::try_from(offset % 30 + 1).unwrap()),
            date: start.checked_add_days(Days::new(offset)),
            times: winter_day(u32::try_from(offset).unwrap() + 10),
        })
        .collect();
    let expires_at = days.last().and_then(|d| d.date);
    ParsedMonth {
        month_label_latin: Some("Joumada II 1447".into()),
        month_label_arabic: None,
        days,
        expires_at,
    }
}

/// Upstream answering from a script and counting calls.
#[derive(Default)]
pub(crate) struct ScriptedUpstream {
    month: Mutex<Option<ParsedMonth>>,
    day: Mutex<Option<DayTimes>>,
    ministry_calls: AtomicUsize,
    calculation_calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub(crate) fn with_month(month: ParsedMonth) -> Self {
        let upstream = Self::default();
        *upstream.month.lock().unwrap() = Some(month);
        upstream
    }

    pub(crate) fn set_day(&self, day: DayTimes) {
        *self.day.lock().unwrap() = Some(day);
    }

    /// Every later Ministry call fails.
    pub(crate) fn break_ministry(&self) {
        *self.month.lock().unwrap() = None;
    }

    pub(crate) fn network_calls(&self) -> usize {
        self.ministry_calls.load(Ordering::SeqCst) + self.calculation_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ministry_calls(&self) -> usize {
        self.ministry_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn fetch_ministry_month(
        &self,
        _city_id: u32,
        _today: NaiveDate,
    ) -> Result<ParsedMonth, SourceError> {
        self.ministry_calls.fetch_add(1, Ordering::SeqCst);
        self.month
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::Http("503 Service Unavailable".into()))
    }

    async fn fetch_calculated_day(
        &self,
        _coords: Coordinates,
        _date: NaiveDate,
    ) -> Result<DayTimes, SourceError> {
        self.calculation_calls.fetch_add(1, Ordering::SeqCst);
        self.day
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::Timeout("no answer".into()))
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) upstream: Arc<ScriptedUpstream>,
    pub(crate) sink: Arc<MemoryNotificationSink>,
    pub(crate) service: PrayerService,
}

pub(crate) fn config() -> SalatConfig {
    let mut config = SalatConfig::default();
    config.location.city_id = CITY;
    config.location.display_name = Some("Rabat".into());
    config
}

pub(crate) async fn harness(upstream: ScriptedUpstream, config: SalatConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(upstream);
    let sink = Arc::new(MemoryNotificationSink::new());
    let service = PrayerService::build(
        config,
        store.clone() as Arc<dyn KeyValueStore>,
        upstream.clone(),
        sink.clone(),
    )
    .await
    .expect("service builds");
    Harness {
        store,
        upstream,
        sink,
        service,
    }
}

/// Ministry page with one dated row per day from `start`.
pub(crate) fn month_page(start: NaiveDate, len: u64) -> String {
    let mut rows = String::new();
    for offset in 0..len {
        let day = start.checked_add_days(Days::new(offset)).expect("date in range");
        rows.push_str(&format!(
            "<tr><td>-</td><td>{}</td><td>{}</td><td>06:{:02}</td><td>08:11</td><td>13:19</td><td>15:50</td><td>18:18</td><td>19:39</td></tr>\n",
            offset + 1,
            day.format("%d/%m"),
            (offset + 30) % 60,
        ));
    }
    format!(
        "<html><body><table>\n<caption>Joumada II 1447 / جمادى الآخرة 1447</caption>\n{rows}</table></body></html>"
    )
}
