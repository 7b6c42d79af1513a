//! Local sun-position calculation: deterministic, no I/O.
//!
//! Used when the device is offline or every remote tier has failed. The
//! equations are the usual low-precision solar model (about one minute of
//! error at mid latitudes), which is plenty for an alarm fallback.

use chrono::{Datelike, NaiveDate};

use crate::config::CalculationParams;
use crate::types::{Coordinates, DayTimes, NOT_AVAILABLE};

/// Sun altitude at sunrise/sunset, accounting for refraction and disc radius.
const HORIZON_ANGLE: f64 = 0.833;

/// Shadow factor for the standard (Shafi'i) Asr.
const ASR_SHADOW_FACTOR: f64 = 1.0;

/// Compute the six times for `date` at `coords`.
///
/// `utc_offset_hours` is the local offset in effect on that date. A time
/// whose hour-angle has no solution (polar day/night) is reported as
/// [`NOT_AVAILABLE`].
pub fn compute_day(
    coords: Coordinates,
    date: NaiveDate,
    utc_offset_hours: f64,
    params: &CalculationParams,
) -> DayTimes {
    let jd = julian_day(date) - coords.longitude / (15.0 * 24.0);
    let solar = SolarDay {
        jd,
        latitude: coords.latitude,
    };

    // Day-fraction guesses refine the sun position for each event.
    let fajr = solar.angle_time(params.fajr_angle, 5.0 / 24.0, true);
    let sunrise = solar.angle_time(HORIZON_ANGLE, 6.0 / 24.0, true);
    let dhuhr = Some(solar.mid_day(12.0 / 24.0));
    let asr = solar.asr_time(ASR_SHADOW_FACTOR, 13.0 / 24.0);
    let maghrib = solar.angle_time(HORIZON_ANGLE, 18.0 / 24.0, false);
    let isha = solar.angle_time(params.isha_angle, 18.0 / 24.0, false);

    let adjust = utc_offset_hours - coords.longitude / 15.0;
    let render = |t: Option<f64>| match t {
        Some(hours) if hours.is_finite() => format_hours(hours + adjust),
        _ => NOT_AVAILABLE.to_owned(),
    };

    DayTimes {
        fajr: render(fajr),
        sunrise: render(sunrise),
        dhuhr: render(dhuhr),
        asr: render(asr),
        maghrib: render(maghrib),
        isha: render(isha),
    }
}

struct SolarDay {
    jd: f64,
    latitude: f64,
}

impl SolarDay {
    /// Solar declination and equation of time for a day fraction.
    fn position(&self, fraction: f64) -> (f64, f64) {
        let d = self.jd + fraction - 2_451_545.0;
        let g = fix_angle(357.529 + 0.985_600_28 * d);
        let q = fix_angle(280.459 + 0.985_647_36 * d);
        let l = fix_angle(q + 1.915 * dsin(g) + 0.020 * dsin(2.0 * g));
        let e = 23.439 - 0.000_000_36 * d;

        let ra = fix_hour(darctan2(dcos(e) * dsin(l), dcos(l)) / 15.0);
        let eqt = q / 15.0 - ra;
        let decl = darcsin(dsin(e) * dsin(l));
        (decl, eqt)
    }

    fn mid_day(&self, fraction: f64) -> f64 {
        let (_, eqt) = self.position(fraction);
        fix_hour(12.0 - eqt)
    }

    /// Time at which the sun is `angle` degrees below the horizon,
    /// before noon when `before_noon` is set.
    fn angle_time(&self, angle: f64, fraction: f64, before_noon: bool) -> Option<f64> {
        let (decl, _) = self.position(fraction);
        let noon = self.mid_day(fraction);
        let cos_h = (-dsin(angle) - dsin(decl) * dsin(self.latitude))
            / (dcos(decl) * dcos(self.latitude));
        if !(-1.0..=1.0).contains(&cos_h) {
            return None;
        }
        let t = darccos(cos_h) / 15.0;
        Some(if before_noon { noon - t } else { noon + t })
    }

    fn asr_time(&self, factor: f64, fraction: f64) -> Option<f64> {
        let (decl, _) = self.position(fraction);
        let angle = -darccot(factor + dtan((self.latitude - decl).abs()));
        self.angle_time(angle, fraction, false)
    }
}

/// Julian day number at 00:00 UTC of `date`.
fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (f64::from(date.year()), f64::from(date.month()));
    let day = f64::from(date.day());
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
}

fn format_hours(hours: f64) -> String {
    let total = (fix_hour(hours) * 60.0).round() as i64;
    let total = total.rem_euclid(24 * 60);
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn fix_angle(a: f64) -> f64 {
    a.rem_euclid(360.0)
}

fn fix_hour(h: f64) -> f64 {
    h.rem_euclid(24.0)
}

fn dsin(d: f64) -> f64 {
    d.to_radians().sin()
}

fn dcos(d: f64) -> f64 {
    d.to_radians().cos()
}

fn dtan(d: f64) -> f64 {
    d.to_radians().tan()
}

fn darcsin(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn darccos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn darctan2(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn darccot(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}
