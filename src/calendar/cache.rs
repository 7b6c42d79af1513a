//! The persisted monthly calendar.
//!
//! On disk a cache is one flat JSON object: day keys map to time objects,
//! and `_`-prefixed keys carry metadata. Day keys follow exactly one of two
//! schemes: ISO dates (`2025-12-22`) or legacy Hijri day numbers (`1`..`30`,
//! plus `moonSighting`).

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use salat_sources::{DayTimes, HijriDay, ParsedMonth};

use crate::error::{Result, SalatError};

const META_MONTH_LATIN: &str = "_monthLabelLatin";
const META_MONTH_ARABIC: &str = "_monthLabelArabic";
const META_FIRST_DATE: &str = "_firstDate_ISO";
const META_LAST_DATE: &str = "_lastDate_ISO";
const META_EXPIRES_AT: &str = "_expiresAt_ISO";
const META_CITY_ID: &str = "_cityId";
const META_CURRENT_HIJRI_DAY: &str = "_currentHijriDay";

/// Day entries under one key scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarDays {
    Gregorian(BTreeMap<NaiveDate, DayTimes>),
    Hijri(BTreeMap<HijriDay, DayTimes>),
}

impl CalendarDays {
    pub fn len(&self) -> usize {
        match self {
            Self::Gregorian(days) => days.len(),
            Self::Hijri(days) => days.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMetadata {
    pub month_label_latin: Option<String>,
    pub month_label_arabic: Option<String>,
    /// Gregorian scheme: first covered date. Hijri scheme: the date of
    /// Hijri day 1, when known.
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    pub city_id: Option<u32>,
    pub current_hijri_day: Option<u8>,
}

/// One city's month of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCalendarCache {
    pub days: CalendarDays,
    pub meta: CalendarMetadata,
}

impl MonthlyCalendarCache {
    /// Build a cache from parser output.
    ///
    /// A fully dated month uses the Gregorian scheme. Otherwise rows are
    /// keyed by Hijri day; the current Hijri day is taken from the row
    /// dated `today`, if any.
    ///
    /// # Errors
    ///
    /// [`SalatError::Parse`] when the month has no rows.
    pub fn from_parsed(city_id: u32, month: &ParsedMonth, today: NaiveDate) -> Result<Self> {
        if month.days.is_empty() {
            return Err(SalatError::Parse("parsed month has no days".into()));
        }

        let mut meta = CalendarMetadata {
            month_label_latin: month.month_label_latin.clone(),
            month_label_arabic: month.month_label_arabic.clone(),
            city_id: Some(city_id),
            ..Default::default()
        };

        let days = if month.is_fully_dated() {
            let days: BTreeMap<NaiveDate, DayTimes> = month
                .days
                .iter()
                .filter_map(|d| d.date.map(|date| (date, d.times.clone())))
                .collect();
            meta.first_date = days.keys().next().copied();
            meta.last_date = days.keys().next_back().copied();
            meta.expires_at = month.expires_at;
            CalendarDays::Gregorian(days)
        } else {
            let current = month.days.iter().find_map(|d| match (d.date, d.hijri_day) {
                (Some(date), HijriDay::Day(n)) if date == today => Some(n),
                _ => None,
            });
            meta.current_hijri_day = current;
            meta.first_date = current
                .and_then(|n| today.checked_sub_days(chrono::Days::new(u64::from(n).saturating_sub(1))));
            CalendarDays::Hijri(
                month
                    .days
                    .iter()
                    .map(|d| (d.hijri_day, d.times.clone()))
                    .collect(),
            )
        };

        Ok(Self { days, meta })
    }

    /// Times for a Gregorian date.
    ///
    /// Hijri caches are mapped through the date of day 1 and have no rows
    /// for any date until [`Self::anchor_legacy`] has fixed it.
    pub fn day(&self, date: NaiveDate) -> Option<&DayTimes> {
        match &self.days {
            CalendarDays::Gregorian(days) => days.get(&date),
            CalendarDays::Hijri(days) => {
                let n = (date - self.meta.first_date?).num_days() + 1;
                let n = u8::try_from(n).ok()?;
                days.get(&HijriDay::Day(n))
            }
        }
    }

    /// Pin a legacy Hijri cache to the calendar.
    ///
    /// Caches written before `_firstDate_ISO` existed only record the Hijri
    /// day that was current when they were stored. The first read places
    /// day 1 at `today - (currentHijriDay - 1)`; later reads count from that
    /// date. Returns true when the metadata changed and should be persisted.
    pub fn anchor_legacy(&mut self, today: NaiveDate) -> bool {
        if !matches!(self.days, CalendarDays::Hijri(_)) || self.meta.first_date.is_some() {
            return false;
        }
        let Some(current) = self.meta.current_hijri_day.filter(|n| *n > 0) else {
            return false;
        };
        self.meta.first_date =
            today.checked_sub_days(chrono::Days::new(u64::from(current) - 1));
        self.meta.first_date.is_some()
    }

    /// Serialize to the flat on-disk object.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match &self.days {
            CalendarDays::Gregorian(days) => {
                for (date, times) in days {
                    map.insert(date.to_string(), day_value(times));
                }
            }
            CalendarDays::Hijri(days) => {
                for (day, times) in days {
                    map.insert(day.to_string(), day_value(times));
                }
            }
        }

        let meta = &self.meta;
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                map.insert(key.to_owned(), Value::String(value));
            }
        };
        put(META_MONTH_LATIN, meta.month_label_latin.clone());
        put(META_MONTH_ARABIC, meta.month_label_arabic.clone());
        put(META_FIRST_DATE, meta.first_date.map(|d| d.to_string()));
        put(META_LAST_DATE, meta.last_date.map(|d| d.to_string()));
        put(META_EXPIRES_AT, meta.expires_at.map(|d| d.to_string()));
        put(META_CITY_ID, meta.city_id.map(|id| id.to_string()));
        put(
            META_CURRENT_HIJRI_DAY,
            meta.current_hijri_day.map(|d| d.to_string()),
        );
        map
    }

    /// Decode the flat on-disk object.
    ///
    /// # Errors
    ///
    /// [`SalatError::CacheCorruption`] when both key schemes are present,
    /// no day entries exist, or an entry or metadata value is malformed.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self> {
        let mut gregorian = BTreeMap::new();
        let mut hijri = BTreeMap::new();
        let mut meta = CalendarMetadata::default();

        for (key, value) in map {
            if key.starts_with('_') {
                read_meta(&mut meta, key, value)?;
            } else if let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
                gregorian.insert(date, parse_day(key, value)?);
            } else if let Some(day) = HijriDay::parse(key) {
                hijri.insert(day, parse_day(key, value)?);
            } else {
                tracing::debug!(key, "ignoring unknown calendar key");
            }
        }

        let days = match (gregorian.is_empty(), hijri.is_empty()) {
            (false, true) => CalendarDays::Gregorian(gregorian),
            (true, false) => CalendarDays::Hijri(hijri),
            (false, false) => {
                return Err(SalatError::CacheCorruption(
                    "calendar mixes date and hijri-day keys".into(),
                ));
            }
            (true, true) => {
                return Err(SalatError::CacheCorruption(
                    "calendar has no day entries".into(),
                ));
            }
        };
        Ok(Self { days, meta })
    }

    /// Decode from a raw JSON string.
    ///
    /// # Errors
    ///
    /// [`SalatError::CacheCorruption`] for anything that is not a valid cache.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SalatError::CacheCorruption(format!("calendar JSON: {e}")))?;
        match value {
            Value::Object(map) => Self::from_json_map(&map),
            _ => Err(SalatError::CacheCorruption(
                "calendar JSON is not an object".into(),
            )),
        }
    }
}

fn day_value(times: &DayTimes) -> Value {
    serde_json::to_value(times).unwrap_or(Value::Null)
}

fn parse_day(key: &str, value: &Value) -> Result<DayTimes> {
    DayTimes::deserialize(value)
        .map_err(|e| SalatError::CacheCorruption(format!("calendar entry {key}: {e}")))
}

fn read_meta(meta: &mut CalendarMetadata, key: &str, value: &Value) -> Result<()> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => return Ok(()),
        other => {
            return Err(SalatError::CacheCorruption(format!(
                "calendar metadata {key} has unexpected value {other}"
            )));
        }
    };
    let date = |text: &str| {
        NaiveDate::parse_from_str(text.get(..10).unwrap_or(text), "%Y-%m-%d").map_err(|e| {
            SalatError::CacheCorruption(format!("calendar metadata {key}: {e}"))
        })
    };
    let number = |text: &str| {
        text.parse::<u32>()
            .map_err(|e| SalatError::CacheCorruption(format!("calendar metadata {key}: {e}")))
    };

    match key {
        META_MONTH_LATIN => meta.month_label_latin = Some(text),
        META_MONTH_ARABIC => meta.month_label_arabic = Some(text),
        META_FIRST_DATE => meta.first_date = Some(date(&text)?),
        META_LAST_DATE => meta.last_date = Some(date(&text)?),
        META_EXPIRES_AT => meta.expires_at = Some(date(&text)?),
        META_CITY_ID => meta.city_id = Some(number(&text)?),
        META_CURRENT_HIJRI_DAY => {
            let day = number(&text)?;
            meta.current_hijri_day = Some(u8::try_from(day).map_err(|e| {
                SalatError::CacheCorruption(format!("calendar metadata {key}: {e}"))
            })?);
        }
        _ => tracing::debug!(key, "ignoring unknown calendar metadata"),
    }
    Ok(())
}

impl Serialize for MonthlyCalendarCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MonthlyCalendarCache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_json_map(&map).map_err(D::Error::custom)
    }
}
