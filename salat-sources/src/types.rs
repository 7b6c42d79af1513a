//! Core types shared by every upstream source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored in place of a time the source could not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// The six daily times as wire strings: `HH:MM` or [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTimes {
    pub fajr: String,
    pub sunrise: String,
    pub dhuhr: String,
    pub asr: String,
    pub maghrib: String,
    pub isha: String,
}

impl DayTimes {
    /// All six times set to [`NOT_AVAILABLE`].
    pub fn unavailable() -> Self {
        Self::from_array(std::array::from_fn(|_| NOT_AVAILABLE.to_owned()))
    }

    /// Build from six raw strings in canonical order, normalising each one.
    pub fn from_raw<S: AsRef<str>>(raw: [S; 6]) -> Self {
        Self::from_array(raw.map(|s| normalize_time(s.as_ref())))
    }

    fn from_array([fajr, sunrise, dhuhr, asr, maghrib, isha]: [String; 6]) -> Self {
        Self {
            fajr,
            sunrise,
            dhuhr,
            asr,
            maghrib,
            isha,
        }
    }

    /// The six times in canonical order.
    pub fn as_array(&self) -> [&str; 6] {
        [
            &self.fajr,
            &self.sunrise,
            &self.dhuhr,
            &self.asr,
            &self.maghrib,
            &self.isha,
        ]
    }

    /// A day is usable only when both Fajr and Isha are known.
    pub fn is_valid(&self) -> bool {
        self.fajr != NOT_AVAILABLE && self.isha != NOT_AVAILABLE
    }
}

/// Normalise an upstream time cell to `HH:MM`, or [`NOT_AVAILABLE`].
///
/// Accepts `H:MM`, `HH:MM`, `HH:MM:SS`, Arabic-Indic digits and trailing
/// annotations such as `05:12 (+01)`.
pub fn normalize_time(raw: &str) -> String {
    let ascii = to_ascii_digits(raw.trim());
    let token = ascii.split_whitespace().next().unwrap_or("");
    let mut parts = token.split(':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return NOT_AVAILABLE.to_owned();
    };
    match (h.parse::<u32>(), m.get(..2).unwrap_or(m).parse::<u32>()) {
        (Ok(h), Ok(m)) if h < 24 && m < 60 => {
            format!("{h:02}:{m:02}")
        }
        _ => NOT_AVAILABLE.to_owned(),
    }
}

/// Replace Arabic-Indic and Eastern Arabic-Indic digits with ASCII digits.
pub fn to_ascii_digits(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from_digit(c as u32 - 0x0660, 10).unwrap_or(c)
            }
            '\u{06F0}'..='\u{06F9}' => {
                char::from_digit(c as u32 - 0x06F0, 10).unwrap_or(c)
            }
            other => other,
        })
        .collect()
}

/// A Hijri day-of-month key, or the moon-sighting sentinel row the
/// Ministry inserts when the month length is still undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HijriDay {
    Day(u8),
    MoonSighting,
}

impl HijriDay {
    /// Persisted key for the moon-sighting row.
    pub const MOON_SIGHTING_KEY: &'static str = "moonSighting";

    /// Parse a persisted or scraped key. Numbers outside `1..=30` are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let ascii = to_ascii_digits(raw.trim());
        if ascii == Self::MOON_SIGHTING_KEY {
            return Some(Self::MoonSighting);
        }
        match ascii.parse::<u8>() {
            Ok(day) if (1..=30).contains(&day) => Some(Self::Day(day)),
            _ => None,
        }
    }
}

impl fmt::Display for HijriDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(day) => write!(f, "{day}"),
            Self::MoonSighting => f.write_str(Self::MOON_SIGHTING_KEY),
        }
    }
}

/// One row of a parsed Ministry month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDay {
    pub hijri_day: HijriDay,
    /// Gregorian date of the row, when the page provides one.
    pub date: Option<NaiveDate>,
    pub times: DayTimes,
}

/// Structured output of the Ministry HTML parser.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMonth {
    pub month_label_latin: Option<String>,
    pub month_label_arabic: Option<String>,
    pub days: Vec<ParsedDay>,
    /// Last covered day, when every row carried a Gregorian date.
    pub expires_at: Option<NaiveDate>,
}

impl ParsedMonth {
    /// True when every row carries a Gregorian date.
    pub fn is_fully_dated(&self) -> bool {
        !self.days.is_empty() && self.days.iter().all(|d| d.date.is_some())
    }
}

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
