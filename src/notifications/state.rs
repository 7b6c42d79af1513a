//! Tri-state notification settings and their persisted form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::error::{Result, SalatError};
use crate::prayer::Prayer;
use crate::store::{KeyValueStore, StoreExt, keys};

/// How loudly one event alerts. Persisted as `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum NotificationState {
    Off,
    Silent,
    Vibrate,
    #[default]
    Full,
}

impl NotificationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Silent => "silent",
            Self::Vibrate => "vibrate",
            Self::Full => "full",
        }
    }
}

impl From<NotificationState> for u8 {
    fn from(state: NotificationState) -> Self {
        match state {
            NotificationState::Off => 0,
            NotificationState::Silent => 1,
            NotificationState::Vibrate => 2,
            NotificationState::Full => 3,
        }
    }
}

impl TryFrom<u8> for NotificationState {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Silent),
            2 => Ok(Self::Vibrate),
            3 => Ok(Self::Full),
            other => Err(format!("unknown notification state {other}")),
        }
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One global state plus optional per-prayer overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    pub global: NotificationState,
    pub per_prayer: BTreeMap<Prayer, NotificationState>,
}

impl StateConfig {
    pub fn uniform(state: NotificationState) -> Self {
        Self {
            global: state,
            per_prayer: BTreeMap::new(),
        }
    }

    /// Effective state: the override in advanced mode, the global value otherwise.
    pub fn resolve(&self, prayer: Prayer, advanced: bool) -> NotificationState {
        if advanced {
            self.per_prayer.get(&prayer).copied().unwrap_or(self.global)
        } else {
            self.global
        }
    }
}

pub const DEFAULT_ATHAN_SOUND: &str = "default";
pub const DEFAULT_REMINDER_MINUTES: u32 = 15;

/// Everything the orchestrator needs to turn a snapshot into alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub athan: StateConfig,
    pub reminder: StateConfig,
    /// Selects per-prayer overrides over the global values.
    pub advanced_mode: bool,
    pub athan_sound: String,
    pub reminder_enabled: bool,
    pub reminder_minutes: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            athan: StateConfig::uniform(NotificationState::Full),
            reminder: StateConfig::uniform(NotificationState::Full),
            advanced_mode: false,
            athan_sound: DEFAULT_ATHAN_SOUND.to_owned(),
            reminder_enabled: false,
            reminder_minutes: DEFAULT_REMINDER_MINUTES,
        }
    }
}

impl NotificationConfig {
    pub fn athan_state(&self, prayer: Prayer) -> NotificationState {
        self.athan.resolve(prayer, self.advanced_mode)
    }

    pub fn reminder_state(&self, prayer: Prayer) -> NotificationState {
        self.reminder.resolve(prayer, self.advanced_mode)
    }

    /// Whether a reminder should be set up for `prayer`.
    pub fn reminder_active(&self, prayer: Prayer) -> bool {
        self.reminder_enabled
            && self.reminder_minutes > 0
            && self.reminder_state(prayer) != NotificationState::Off
    }

    /// Read from the store. Missing keys take defaults; unreadable keys are
    /// deleted and take defaults.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let defaults = Self::default();

        let athan_global = read_or_reset::<NotificationState>(store, keys::NOTIFICATION_STATE)
            .await?
            .unwrap_or(defaults.athan.global);
        let reminder_global = read_or_reset::<NotificationState>(store, keys::REMINDER_STATE)
            .await?
            .unwrap_or(defaults.reminder.global);
        let athan_overrides = read_or_reset(store, keys::PRAYER_NOTIFICATION_STATES)
            .await?
            .unwrap_or_default();
        let reminder_overrides = read_or_reset(store, keys::REMINDER_NOTIFICATION_STATES)
            .await?
            .unwrap_or_default();

        Ok(Self {
            athan: StateConfig {
                global: athan_global,
                per_prayer: athan_overrides,
            },
            reminder: StateConfig {
                global: reminder_global,
                per_prayer: reminder_overrides,
            },
            advanced_mode: read_or_reset(store, keys::ADVANCED_NOTIFICATION_MODE)
                .await?
                .unwrap_or(defaults.advanced_mode),
            athan_sound: read_or_reset(store, keys::ATHAN_SOUND_TYPE)
                .await?
                .unwrap_or(defaults.athan_sound),
            reminder_enabled: read_or_reset(store, keys::REMINDER_ENABLED)
                .await?
                .unwrap_or(defaults.reminder_enabled),
            reminder_minutes: read_or_reset(store, keys::REMINDER_MINUTES)
                .await?
                .unwrap_or(defaults.reminder_minutes),
        })
    }

    /// Write every key. Each key is replaced whole.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set_json(keys::NOTIFICATION_STATE, &self.athan.global).await?;
        store.set_json(keys::REMINDER_STATE, &self.reminder.global).await?;
        store
            .set_json(keys::PRAYER_NOTIFICATION_STATES, &self.athan.per_prayer)
            .await?;
        store
            .set_json(keys::REMINDER_NOTIFICATION_STATES, &self.reminder.per_prayer)
            .await?;
        store
            .set_bool(keys::ADVANCED_NOTIFICATION_MODE, self.advanced_mode)
            .await?;
        store
            .set_json(keys::ATHAN_SOUND_TYPE, &self.athan_sound)
            .await?;
        store
            .set_bool(keys::REMINDER_ENABLED, self.reminder_enabled)
            .await?;
        store
            .set_int(keys::REMINDER_MINUTES, i64::from(self.reminder_minutes))
            .await
    }
}

async fn read_or_reset<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned + Send,
{
    match store.get_json::<T>(key).await {
        Ok(value) => Ok(value),
        Err(SalatError::CacheCorruption(e)) => {
            warn!(key, error = %e, "notification setting unreadable, resetting");
            store.remove(key).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
