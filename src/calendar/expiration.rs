//! When a monthly cache stops being trusted.
//!
//! An expiration is a calendar date; the cache expires at local midnight
//! starting that date.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use salat_sources::HijriDay;

use super::cache::{CalendarDays, MonthlyCalendarCache};

/// Fallback lifetime when neither key scheme yields a date.
pub const DEFAULT_EXPIRATION_DAYS: u64 = 30;

/// Derive the expiration date of `cache`.
///
/// Order of preference: the stored `_expiresAt_ISO`, the latest ISO date
/// key, then the legacy Hijri estimate. The Hijri estimate ends on the last
/// numbered day counted from the date of day 1; the moon-sighting row is not
/// counted. An unanchored cache places day 1 at
/// `today - (currentHijriDay - 1)`. Returns `None` when nothing applies.
pub fn compute_expiration(cache: &MonthlyCalendarCache, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(expires_at) = cache.meta.expires_at {
        return Some(expires_at);
    }
    match &cache.days {
        CalendarDays::Gregorian(days) => days.keys().next_back().copied(),
        CalendarDays::Hijri(days) => {
            let numbered = days
                .keys()
                .filter(|k| matches!(k, HijriDay::Day(_)))
                .count() as u64;
            if numbered == 0 {
                return None;
            }
            let creation = match cache.meta.first_date {
                Some(first) => first,
                None => {
                    let current = u64::from(cache.meta.current_hijri_day?);
                    if current == 0 {
                        return None;
                    }
                    today.checked_sub_days(Days::new(current - 1))?
                }
            };
            creation.checked_add_days(Days::new(numbered - 1))
        }
    }
}

/// Instant at which an expiration date takes effect.
pub fn expiration_instant(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// True when the cache is absent, has no derivable expiration, or `now`
/// is on or after its expiration.
pub fn should_refresh(cache: Option<&MonthlyCalendarCache>, now: NaiveDateTime) -> bool {
    let Some(cache) = cache else {
        return true;
    };
    match compute_expiration(cache, now.date()) {
        Some(date) => now >= expiration_instant(date),
        None => true,
    }
}

/// Expiration to store after a successful refresh.
///
/// Falls back to [`DEFAULT_EXPIRATION_DAYS`] when nothing can be derived,
/// and never returns a date whose instant is at or before `now`.
pub fn expiration_after_refresh(cache: &MonthlyCalendarCache, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let computed = compute_expiration(cache, today).unwrap_or_else(|| {
        tracing::warn!("no expiration derivable from calendar, using 30-day default");
        today
            .checked_add_days(Days::new(DEFAULT_EXPIRATION_DAYS))
            .unwrap_or(today)
    });
    if expiration_instant(computed) > now {
        computed
    } else {
        today.succ_opt().unwrap_or(today)
    }
}
