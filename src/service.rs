//! Foreground and job-facing pipeline: resolve, notify, publish.
//!
//! Data only flows one way. Notification scheduling and settings changes
//! read the last good snapshot and never start a fetch.

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use salat_sources::Upstream;

use crate::calendar::{CalendarCacheManager, RefreshOutcome};
use crate::config::SalatConfig;
use crate::error::{Result, SalatError};
use crate::notifications::{NotificationOrchestrator, NotificationSink, ScheduleReport};
use crate::prayer::PrayerSnapshot;
use crate::resolver::{ResolveRequest, SourceResolver};
use crate::settings::SettingsStore;
use crate::store::{KeyValueStore, StoreExt, keys};
use crate::widget::WidgetCacheBridge;

pub struct PrayerService {
    config: SalatConfig,
    store: Arc<dyn KeyValueStore>,
    calendar: Arc<CalendarCacheManager>,
    resolver: SourceResolver,
    orchestrator: NotificationOrchestrator,
    widget: WidgetCacheBridge,
    settings: Arc<SettingsStore>,
}

impl PrayerService {
    /// Wire every component over one store, upstream and sink.
    ///
    /// # Errors
    ///
    /// Invalid config, or a store failure while loading settings.
    pub async fn build(
        config: SalatConfig,
        store: Arc<dyn KeyValueStore>,
        upstream: Arc<dyn Upstream>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;
        let settings =
            Arc::new(SettingsStore::load(store.clone(), config.sources.preference).await?);
        let network_timeout = Duration::from_secs(config.sources.upstream.timeout_seconds);

        let calendar = Arc::new(CalendarCacheManager::new(store.clone(), upstream.clone()));
        let resolver = SourceResolver::new(
            store.clone(),
            upstream,
            calendar.clone(),
            config.sources.upstream.calculation,
        )
        .with_network_timeout(network_timeout);

        Ok(Self {
            widget: WidgetCacheBridge::new(store.clone(), config.widget.freshness_hours),
            orchestrator: NotificationOrchestrator::new(sink),
            config,
            store,
            calendar,
            resolver,
            settings,
        })
    }

    pub fn config(&self) -> &SalatConfig {
        &self.config
    }

    pub fn calendar(&self) -> &CalendarCacheManager {
        &self.calendar
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        self.settings.clone()
    }

    pub fn city_id(&self) -> u32 {
        self.config.location.city_id
    }

    fn request(&self, today: NaiveDate) -> ResolveRequest {
        ResolveRequest::from_config(&self.config, self.settings.current().source, today)
    }

    /// Resolve today's times, reschedule notifications, publish to the
    /// widget and remember the result as last known good.
    ///
    /// Notification and widget failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// [`SalatError::NoValidSource`] when resolution fails.
    pub async fn refresh_today(&self, now: NaiveDateTime) -> Result<PrayerSnapshot> {
        let snapshot = self.resolver.resolve(&self.request(now.date()), now).await?;
        let settings = self.settings.current();

        if let Err(e) = self
            .orchestrator
            .schedule_today(&snapshot, &settings.notifications, now)
            .await
        {
            warn!(error = %e, "notification scheduling failed");
        }
        self.widget.publish(&snapshot, &settings.appearance, now).await;

        if let Err(e) = self
            .store
            .set_json(&keys::last_good_snapshot(self.city_id()), &snapshot)
            .await
        {
            warn!(error = %e, "could not remember last good snapshot");
        }

        info!(
            city_id = self.city_id(),
            source = %snapshot.source_used,
            date = %snapshot.date,
            "prayer times loaded"
        );
        Ok(snapshot)
    }

    /// [`Self::refresh_today`], falling back to the last good snapshot
    /// (marked stale) when every source fails.
    ///
    /// # Errors
    ///
    /// [`SalatError::FirstLoadFailed`] when nothing has ever loaded.
    pub async fn load_today(&self, now: NaiveDateTime) -> Result<PrayerSnapshot> {
        let err = match self.refresh_today(now).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e) => e,
        };
        warn!(error = %err, "load failed, trying last good snapshot");
        match self.last_good().await {
            Some(mut snapshot) => {
                snapshot.stale = true;
                Ok(snapshot)
            }
            None => Err(SalatError::FirstLoadFailed(err.to_string())),
        }
    }

    /// Force a monthly refresh, then load. A failed refresh still loads.
    pub async fn manual_refresh(&self, now: NaiveDateTime) -> Result<PrayerSnapshot> {
        match self.calendar.refresh(self.city_id(), now).await {
            Ok(RefreshOutcome {
                expiration, days, ..
            }) => info!(city_id = self.city_id(), %expiration, days, "calendar refreshed"),
            Err(e) => warn!(city_id = self.city_id(), error = %e, "manual calendar refresh failed"),
        }
        self.load_today(now).await
    }

    /// Reschedule notifications and republish the widget from the last
    /// good snapshot, without fetching anything.
    ///
    /// Returns `None` when there is no snapshot to work from.
    pub async fn reschedule(&self, now: NaiveDateTime) -> Result<Option<ScheduleReport>> {
        let Some(snapshot) = self.last_good().await else {
            debug!("no snapshot to reschedule from");
            return Ok(None);
        };
        let settings = self.settings.current();
        let report = self
            .orchestrator
            .schedule_today(&snapshot, &settings.notifications, now)
            .await?;
        self.widget.publish(&snapshot, &settings.appearance, now).await;
        Ok(Some(report))
    }

    /// Watch settings and reschedule on every change until `cancel` fires.
    pub fn spawn_settings_watcher(
        self: Arc<Self>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let mut rx = self.settings.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        rx.borrow_and_update();
                        if let Err(e) = self.reschedule(Local::now().naive_local()).await {
                            warn!(error = %e, "reschedule after settings change failed");
                        }
                    }
                }
            }
        })
    }

    async fn last_good(&self) -> Option<PrayerSnapshot> {
        match self
            .store
            .get_json::<PrayerSnapshot>(&keys::last_good_snapshot(self.city_id()))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "last good snapshot unreadable");
                None
            }
        }
    }
}
