//! Upstream source configuration with sensible defaults.
//!
//! [`SourceConfig`] controls endpoints, timeouts and the custom calculation
//! profile. The defaults target the Ministry page and a public calculation
//! API with angles tuned for the region.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Default Ministry endpoint; the city id goes in the `ville` query parameter.
pub const DEFAULT_MINISTRY_URL: &str = "https://www.habous.gov.ma/prieres/horaire_hijri_2.php";

/// Default calculation API base URL.
pub const DEFAULT_CALCULATION_URL: &str = "https://api.aladhan.com/v1";

/// Method code the calculation API uses for a custom angle profile.
pub const CUSTOM_METHOD_CODE: u8 = 99;

/// Depression angles and method code for calculated times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationParams {
    /// Sun depression angle for Fajr, in degrees.
    pub fajr_angle: f64,
    /// Sun depression angle for Isha, in degrees.
    pub isha_angle: f64,
    /// Calculation API method code.
    pub method: u8,
}

impl Default for CalculationParams {
    fn default() -> Self {
        Self {
            fajr_angle: 19.0,
            isha_angle: 17.0,
            method: CUSTOM_METHOD_CODE,
        }
    }
}

/// Configuration for upstream access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Ministry page URL (without query string).
    pub ministry_url: String,
    /// Calculation API base URL.
    pub calculation_url: String,
    /// Per-request timeout in seconds, covering connect and body read.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through a built-in list.
    pub user_agent: Option<String>,
    /// Angles used both for the calculation API and the local fallback.
    pub calculation: CalculationParams,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ministry_url: DEFAULT_MINISTRY_URL.to_owned(),
            calculation_url: DEFAULT_CALCULATION_URL.to_owned(),
            timeout_seconds: 10,
            user_agent: None,
            calculation: CalculationParams::default(),
        }
    }
}

impl SourceConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - both URLs must be non-empty
    /// - angles must lie in `(0, 30]`
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.timeout_seconds == 0 {
            return Err(SourceError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.ministry_url.trim().is_empty() {
            return Err(SourceError::Config("ministry_url must not be empty".into()));
        }
        if self.calculation_url.trim().is_empty() {
            return Err(SourceError::Config(
                "calculation_url must not be empty".into(),
            ));
        }
        for (name, angle) in [
            ("fajr_angle", self.calculation.fajr_angle),
            ("isha_angle", self.calculation.isha_angle),
        ] {
            if !(angle > 0.0 && angle <= 30.0) {
                return Err(SourceError::Config(format!(
                    "{name} must be in (0, 30], got {angle}"
                )));
            }
        }
        Ok(())
    }
}
