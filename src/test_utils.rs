//! Shared test utilities used across unit test modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use salat_sources::{Coordinates, DayTimes, HijriDay, ParsedDay, ParsedMonth, SourceError, Upstream};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

/// A plausible winter day; Fajr varies with `minute` so days are distinguishable.
pub fn winter_day(minute: u32) -> DayTimes {
    DayTimes::from_raw([
        format!("06:{:02}", minute % 60),
        "08:11".to_owned(),
        "13:19".to_owned(),
        "15:50".to_owned(),
        "18:18".to_owned(),
        "19:39".to_owned(),
    ])
}

/// A fully dated month of `len` days starting at `start`.
pub fn month_for(start: NaiveDate, len: u64) -> ParsedMonth {
    let days: Vec<ParsedDay> = (0..len)
        .map(|offset| {
            let date = start.checked_add_days(Days::new(offset)).unwrap();
            ParsedDay {
                hijri_day: HijriDay::Day(u8::try_from(offset % 30 + 1).unwrap()),
                date: Some(date),
                times: winter_day(u32::try_from(offset).unwrap() + 10),
            }
        })
        .collect();
    let expires_at = days.last().and_then(|d| d.date);
    ParsedMonth {
        month_label_latin: Some("Joumada II 1447".into()),
        month_label_arabic: Some("جمادى الآخرة 1447".into()),
        days,
        expires_at,
    }
}

fn clone_error(err: &SourceError) -> SourceError {
    match err {
        SourceError::Timeout(m) => SourceError::Timeout(m.clone()),
        SourceError::Http(m) => SourceError::Http(m.clone()),
        SourceError::Parse(m) => SourceError::Parse(m.clone()),
        SourceError::Config(m) => SourceError::Config(m.clone()),
        SourceError::Unavailable(m) => SourceError::Unavailable(m.clone()),
    }
}

/// [`Upstream`] that replays scripted answers and counts calls.
#[derive(Default)]
pub struct ScriptedUpstream {
    month: Mutex<Option<Result<ParsedMonth, SourceError>>>,
    day: Mutex<Option<Result<DayTimes, SourceError>>>,
    ministry_calls: AtomicUsize,
    calculation_calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn with_month(month: ParsedMonth) -> Self {
        let upstream = Self::default();
        upstream.set_month(month);
        upstream
    }

    pub fn set_month(&self, month: ParsedMonth) {
        *self.month.lock().unwrap() = Some(Ok(month));
    }

    pub fn fail_ministry(&self, err: SourceError) {
        *self.month.lock().unwrap() = Some(Err(err));
    }

    pub fn set_day(&self, day: DayTimes) {
        *self.day.lock().unwrap() = Some(Ok(day));
    }

    pub fn ministry_calls(&self) -> usize {
        self.ministry_calls.load(Ordering::SeqCst)
    }

    pub fn calculation_calls(&self) -> usize {
        self.calculation_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.ministry_calls() + self.calculation_calls()
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
        match &*self.month.lock().unwrap() {
            Some(Ok(month)) => Ok(month.clone()),
            Some(Err(e)) => Err(clone_error(e)),
            None => Err(SourceError::Http("no scripted month".into())),
        }
    }

    async fn fetch_calculated_day(
        &self,
        _coords: Coordinates,
        _date: NaiveDate,
    ) -> Result<DayTimes, SourceError> {
        self.calculation_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.day.lock().unwrap() {
            Some(Ok(day)) => Ok(day.clone()),
            Some(Err(e)) => Err(clone_error(e)),
            None => Err(SourceError::Http("no scripted day".into())),
        }
    }
}
