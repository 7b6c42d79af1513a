//! Prayers and the daily snapshot handed from resolver to consumers.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use salat_sources::{DayTimes, NOT_AVAILABLE};

/// The six daily times, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Fajr => "fajr",
            Self::Sunrise => "sunrise",
            Self::Dhuhr => "dhuhr",
            Self::Asr => "asr",
            Self::Maghrib => "maghrib",
            Self::Isha => "isha",
        }
    }

    /// Position in [`Prayer::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(raw.trim()))
    }

    /// The matching wire string in `times`.
    pub fn time_in(self, times: &DayTimes) -> &str {
        times.as_array()[self.index()]
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which tier produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceUsed {
    MonthlyCache,
    DailyCache,
    Ministry,
    Calculation,
    Local,
}

impl fmt::Display for SourceUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MonthlyCache => "monthlyCache",
            Self::DailyCache => "dailyCache",
            Self::Ministry => "ministry",
            Self::Calculation => "calculation",
            Self::Local => "local",
        })
    }
}

/// Parse an `HH:MM` wire string. `N/A` and garbage yield `None`.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    if raw == NOT_AVAILABLE {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Six times for one calendar day plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerSnapshot {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub times: DayTimes,
    pub source_used: SourceUsed,
    #[serde(default)]
    pub display_location: Option<String>,
    /// Tomorrow's Fajr (`HH:MM`), when the source knows it.
    #[serde(default)]
    pub tomorrow_fajr: Option<String>,
    /// Set when this is a last-known-good copy shown after a failed load.
    #[serde(default)]
    pub stale: bool,
}

impl PrayerSnapshot {
    pub fn new(date: NaiveDate, times: DayTimes, source_used: SourceUsed) -> Self {
        Self {
            date,
            times,
            source_used,
            display_location: None,
            tomorrow_fajr: None,
            stale: false,
        }
    }

    /// Valid iff both Fajr and Isha are present.
    pub fn is_valid(&self) -> bool {
        self.times.is_valid()
    }

    pub fn time_of(&self, prayer: Prayer) -> &str {
        prayer.time_in(&self.times)
    }

    /// Absolute local time of `prayer` on the snapshot's date.
    pub fn at(&self, prayer: Prayer) -> Option<NaiveDateTime> {
        parse_hhmm(self.time_of(prayer)).map(|t| self.date.and_time(t))
    }

    /// Next day's Fajr: the known value when present, otherwise today's
    /// Fajr shifted by 24 hours.
    pub fn next_day_fajr(&self) -> Option<NaiveDateTime> {
        let tomorrow = self.date.succ_opt()?;
        match self.tomorrow_fajr.as_deref().and_then(parse_hhmm) {
            Some(t) => Some(tomorrow.and_time(t)),
            None => self.at(Prayer::Fajr).map(|t| t + chrono::Duration::hours(24)),
        }
    }
}
