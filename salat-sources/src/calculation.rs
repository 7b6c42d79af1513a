//! Calculation API source: times computed remotely from coordinates and a
//! custom angle profile.
//!
//! The API has answered in more than one envelope over time. Instead of
//! probing fields ad hoc, the known shapes are modelled as a tagged union
//! ([`CalculationResponse`]) with a single [`CalculationResponse::normalize`]
//! step.

use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::types::{Coordinates, DayTimes};

/// Timing map as returned by the API. Extra keys (Sunset, Imsak, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimings {
    #[serde(rename = "Fajr", alias = "fajr")]
    pub fajr: Option<String>,
    #[serde(rename = "Sunrise", alias = "sunrise")]
    pub sunrise: Option<String>,
    #[serde(rename = "Dhuhr", alias = "dhuhr")]
    pub dhuhr: Option<String>,
    #[serde(rename = "Asr", alias = "asr")]
    pub asr: Option<String>,
    #[serde(rename = "Maghrib", alias = "maghrib")]
    pub maghrib: Option<String>,
    #[serde(rename = "Isha", alias = "isha")]
    pub isha: Option<String>,
}

/// `{ "timings": { ... } }`
#[derive(Debug, Clone, Deserialize)]
pub struct TimingsEnvelope {
    pub timings: RawTimings,
}

/// Every response shape the API is known to produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CalculationResponse {
    /// `{ "code": 200, "data": { "timings": { ... } } }`
    Wrapped { data: TimingsEnvelope },
    /// `{ "timings": { ... } }`
    Envelope(TimingsEnvelope),
    /// `{ "Fajr": "...", ... }`
    Bare(RawTimings),
}

impl CalculationResponse {
    /// Collapse any known shape into [`DayTimes`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Parse`] when none of the six times is present.
    pub fn normalize(self) -> Result<DayTimes, SourceError> {
        let timings = match self {
            Self::Wrapped { data } => data.timings,
            Self::Envelope(envelope) => envelope.timings,
            Self::Bare(timings) => timings,
        };
        let fields = [
            timings.fajr,
            timings.sunrise,
            timings.dhuhr,
            timings.asr,
            timings.maghrib,
            timings.isha,
        ];
        if fields.iter().all(Option::is_none) {
            return Err(SourceError::Parse(
                "calculation response has no timings".into(),
            ));
        }
        Ok(DayTimes::from_raw(fields.map(Option::unwrap_or_default)))
    }
}

/// Build the timings URL for a date and location.
pub fn timings_url(
    config: &SourceConfig,
    coords: Coordinates,
    date: NaiveDate,
) -> Result<Url, SourceError> {
    let base = config.calculation_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/timings/{}", date.format("%d-%m-%Y")))
        .map_err(|e| SourceError::Config(format!("invalid calculation_url: {e}")))?;
    let params = config.calculation;
    url.query_pairs_mut()
        .append_pair("latitude", &coords.latitude.to_string())
        .append_pair("longitude", &coords.longitude.to_string())
        .append_pair("method", &params.method.to_string())
        .append_pair(
            "methodSettings",
            &format!("{},null,{}", params.fajr_angle, params.isha_angle),
        );
    Ok(url)
}

/// Fetch calculated times for one day.
pub async fn fetch_day(
    client: &reqwest::Client,
    config: &SourceConfig,
    coords: Coordinates,
    date: NaiveDate,
) -> Result<DayTimes, SourceError> {
    let url = timings_url(config, coords, date)?;
    let body = crate::http::get_text(
        client,
        url,
        Duration::from_secs(config.timeout_seconds),
        "calculation request",
    )
    .await?;
    parse_calculation_json(&body)
}

/// Parse a calculation API body.
pub fn parse_calculation_json(body: &str) -> Result<DayTimes, SourceError> {
    let response: CalculationResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Parse(format!("calculation response: {e}")))?;
    response.normalize()
}
