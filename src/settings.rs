//! Observable settings store.
//!
//! One [`SettingsStore`] is built at startup and handed to whoever needs
//! settings. Readers take a snapshot with [`SettingsStore::current`] or
//! watch for changes with [`SettingsStore::subscribe`]; writers go through
//! [`SettingsStore::update`], which persists before broadcasting.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::config::SourcePreference;
use crate::error::{Result, SalatError};
use crate::notifications::NotificationConfig;
use crate::store::{KeyValueStore, StoreExt, keys};

/// Look of the app and widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    /// Accent hue in degrees, `0..360`.
    pub theme_hue: f64,
    pub is_dark_mode: bool,
    /// Widget background opacity, `0..=1`.
    pub bg_opacity: f64,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            theme_hue: 150.0,
            is_dark_mode: false,
            bg_opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub notifications: NotificationConfig,
    pub appearance: Appearance,
    pub source: SourcePreference,
}

pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    tx: watch::Sender<AppSettings>,
    write: Mutex<()>,
}

impl SettingsStore {
    /// Load every setting, falling back to defaults and to
    /// `default_source` for the source preference.
    ///
    /// # Errors
    ///
    /// Store failures only; unreadable values are reset.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        default_source: SourcePreference,
    ) -> Result<Self> {
        let notifications = NotificationConfig::load(store.as_ref()).await?;

        let defaults = Appearance::default();
        let appearance = Appearance {
            theme_hue: read_or_reset(store.as_ref(), keys::THEME_HUE)
                .await?
                .unwrap_or(defaults.theme_hue),
            is_dark_mode: read_or_reset(store.as_ref(), keys::IS_DARK_MODE)
                .await?
                .unwrap_or(defaults.is_dark_mode),
            bg_opacity: read_or_reset(store.as_ref(), keys::BG_OPACITY)
                .await?
                .unwrap_or(defaults.bg_opacity),
        };
        let source = read_or_reset(store.as_ref(), keys::PRAYER_SOURCE)
            .await?
            .unwrap_or(default_source);

        let (tx, _rx) = watch::channel(AppSettings {
            notifications,
            appearance,
            source,
        });
        Ok(Self {
            store,
            tx,
            write: Mutex::new(()),
        })
    }

    pub fn current(&self) -> AppSettings {
        self.tx.borrow().clone()
    }

    /// Receiver that sees every later update.
    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }

    /// Apply `change`, persist the result and notify subscribers.
    ///
    /// Nothing is broadcast if persisting fails.
    pub async fn update<F>(&self, change: F) -> Result<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let _write = self.write.lock().await;
        let mut next = self.current();
        change(&mut next);
        validate(&next)?;
        self.save(&next).await?;
        self.tx.send_replace(next.clone());
        debug!("settings updated");
        Ok(next)
    }

    async fn save(&self, settings: &AppSettings) -> Result<()> {
        let store = self.store.as_ref();
        settings.notifications.save(store).await?;
        store
            .set_json(keys::THEME_HUE, &settings.appearance.theme_hue)
            .await?;
        store
            .set_bool(keys::IS_DARK_MODE, settings.appearance.is_dark_mode)
            .await?;
        store
            .set_json(keys::BG_OPACITY, &settings.appearance.bg_opacity)
            .await?;
        store.set_json(keys::PRAYER_SOURCE, &settings.source).await
    }
}

fn validate(settings: &AppSettings) -> Result<()> {
    let appearance = &settings.appearance;
    if !(0.0..360.0).contains(&appearance.theme_hue) {
        return Err(SalatError::Config(format!(
            "theme hue {} outside 0..360",
            appearance.theme_hue
        )));
    }
    if !(0.0..=1.0).contains(&appearance.bg_opacity) {
        return Err(SalatError::Config(format!(
            "background opacity {} outside 0..=1",
            appearance.bg_opacity
        )));
    }
    Ok(())
}

async fn read_or_reset<T: DeserializeOwned + Send>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get_json::<T>(key).await {
        Ok(value) => Ok(value),
        Err(SalatError::CacheCorruption(e)) => {
            warn!(key, "resetting unreadable setting: {e}");
            store.remove(key).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
