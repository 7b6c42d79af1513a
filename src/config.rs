//! Application configuration, persisted as TOML.
//!
//! Every section is `#[serde(default)]`, so a partial file (or none at all)
//! yields a usable config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use salat_sources::{Coordinates, SourceConfig};

use crate::error::{Result, SalatError};

/// Default Ministry city id (Rabat).
pub const DEFAULT_CITY_ID: u32 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalatConfig {
    pub location: LocationConfig,
    pub sources: SourcesConfig,
    pub scheduler: SchedulerConfig,
    pub widget: WidgetConfig,
}

/// Where the user is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Ministry city id, also the suffix of every city-scoped key.
    pub city_id: u32,
    /// Name shown next to the times.
    pub display_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            city_id: DEFAULT_CITY_ID,
            display_name: None,
            latitude: None,
            longitude: None,
        }
    }
}

impl LocationConfig {
    /// Coordinates, when both halves are configured.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Which remote source the user prefers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    #[default]
    Ministry,
    Calculation,
}

impl SourcePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ministry => "ministry",
            Self::Calculation => "calculation",
        }
    }
}

/// Source selection plus upstream endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub preference: SourcePreference,
    /// Skip every network tier and compute locally.
    pub offline: bool,
    pub upstream: SourceConfig,
}

/// Local job runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Local wall-clock hour of the daily refresh.
    pub daily_hour: u32,
    pub daily_minute: u32,
    /// Seconds between runner ticks.
    pub tick_interval_secs: u64,
    /// Run-history entries kept.
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_hour: 2,
            daily_minute: 0,
            tick_interval_secs: 60,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Hours a published widget blob stays fresh.
    pub freshness_hours: i64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            freshness_hours: 24,
        }
    }
}

impl SalatConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| SalatError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SalatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::salat_dirs::config_file()
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`SalatError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        self.sources.upstream.validate()?;
        if self.scheduler.daily_hour > 23 || self.scheduler.daily_minute > 59 {
            return Err(SalatError::Config(format!(
                "daily refresh time {:02}:{:02} is not a valid time of day",
                self.scheduler.daily_hour, self.scheduler.daily_minute
            )));
        }
        if self.scheduler.tick_interval_secs == 0 {
            return Err(SalatError::Config(
                "tick_interval_secs must be greater than 0".into(),
            ));
        }
        if self.widget.freshness_hours <= 0 {
            return Err(SalatError::Config(
                "freshness_hours must be greater than 0".into(),
            ));
        }
        if self.sources.preference == SourcePreference::Calculation
            && self.location.coordinates().is_none()
        {
            return Err(SalatError::Config(
                "calculation source needs latitude and longitude".into(),
            ));
        }
        Ok(())
    }
}
