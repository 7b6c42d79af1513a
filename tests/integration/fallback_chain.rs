//! Tier ordering and the validity gate of the source resolver.

use std::sync::Arc;

use salat::calendar::CalendarCacheManager;
use salat::config::SourcePreference;
use salat::resolver::{ResolveRequest, SourceResolver};
use salat::store::{KeyValueStore, MemoryStore, keys};
use salat::{SalatError, SourceUsed};
use salat_sources::{CalculationParams, Coordinates};
use serde_json::{Value, json};

use crate::helpers::{
    CITY, ScriptedUpstream, at, date, gregorian_cache_json, hijri_cache_json, month,
};

fn request(preference: SourcePreference) -> ResolveRequest {
    ResolveRequest {
        city_id: CITY,
        preference,
        offline: false,
        coordinates: None,
        display_location: Some("Rabat".into()),
        utc_offset_hours: 1.0,
    }
}

fn resolver(store: &Arc<MemoryStore>, upstream: &Arc<ScriptedUpstream>) -> SourceResolver {
    let calendar = Arc::new(CalendarCacheManager::new(store.clone(), upstream.clone()));
    SourceResolver::new(
        store.clone(),
        upstream.clone(),
        calendar,
        CalculationParams::default(),
    )
}

#[tokio::test]
async fn monthly_cache_hit_makes_no_network_calls() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(&keys::calendar(CITY), gregorian_cache_json(date(2025, 12, 1), 31))
        .await
        .unwrap();
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));

    let snapshot = resolver(&store, &upstream)
        .resolve(&request(SourcePreference::Ministry), at(2025, 12, 20, 9, 0))
        .await
        .unwrap();

    assert_eq!(snapshot.source_used, SourceUsed::MonthlyCache);
    assert_eq!(snapshot.display_location.as_deref(), Some("Rabat"));
    assert_eq!(upstream.network_calls(), 0);
}

#[tokio::test]
async fn legacy_hijri_cache_follows_the_date() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(&keys::calendar(CITY), hijri_cache_json(29, 10))
        .await
        .unwrap();
    let upstream = Arc::new(ScriptedUpstream::default());
    let resolver = resolver(&store, &upstream);
    let req = request(SourcePreference::Ministry);

    let first = resolver.resolve(&req, at(2025, 12, 20, 9, 0)).await.unwrap();
    let next = resolver.resolve(&req, at(2025, 12, 21, 9, 0)).await.unwrap();

    assert_eq!(first.source_used, SourceUsed::MonthlyCache);
    assert_eq!(first.times.fajr, "06:10");
    assert_eq!(first.tomorrow_fajr.as_deref(), Some("06:11"));
    assert_eq!(next.source_used, SourceUsed::MonthlyCache);
    assert_eq!(next.times.fajr, "06:11");
    assert_eq!(upstream.network_calls(), 0);

    let stored: Value = serde_json::from_str(
        &store.get(&keys::calendar(CITY)).await.unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(stored["_firstDate_ISO"], "2025-12-11");
}

#[tokio::test]
async fn unavailable_fajr_in_cache_is_never_returned() {
    let store = Arc::new(MemoryStore::new());
    let mut cache: Value =
        serde_json::from_str(&gregorian_cache_json(date(2025, 12, 1), 31)).unwrap();
    cache["2025-12-20"]["fajr"] = json!("N/A");
    store
        .set(&keys::calendar(CITY), cache.to_string())
        .await
        .unwrap();
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));

    let snapshot = resolver(&store, &upstream)
        .resolve(&request(SourcePreference::Ministry), at(2025, 12, 20, 9, 0))
        .await
        .unwrap();

    assert_eq!(snapshot.source_used, SourceUsed::Ministry);
    assert_ne!(snapshot.times.fajr, "N/A");
    assert!(snapshot.is_valid());
    assert_eq!(upstream.ministry_calls(), 1);
}

#[tokio::test]
async fn live_fetch_fills_the_daily_cache_for_the_next_load() {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));
    let resolver = resolver(&store, &upstream);
    let now = at(2025, 12, 20, 9, 0);

    let first = resolver
        .resolve(&request(SourcePreference::Ministry), now)
        .await
        .unwrap();
    assert_eq!(first.source_used, SourceUsed::Ministry);

    upstream.break_ministry();
    let second = resolver
        .resolve(&request(SourcePreference::Ministry), now)
        .await
        .unwrap();
    assert_eq!(second.source_used, SourceUsed::DailyCache);
    assert_eq!(second.times, first.times);
}

#[tokio::test]
async fn every_remote_failure_falls_back_to_local_calculation() {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(ScriptedUpstream::default());
    let mut req = request(SourcePreference::Ministry);
    req.coordinates = Some(Coordinates {
        latitude: 34.02,
        longitude: -6.83,
    });

    let snapshot = resolver(&store, &upstream)
        .resolve(&req, at(2025, 12, 20, 9, 0))
        .await
        .unwrap();

    assert_eq!(snapshot.source_used, SourceUsed::Local);
    assert!(snapshot.is_valid());
    assert!(snapshot.tomorrow_fajr.is_some());
}

#[tokio::test]
async fn nothing_valid_anywhere_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(ScriptedUpstream::default());

    let err = resolver(&store, &upstream)
        .resolve(&request(SourcePreference::Ministry), at(2025, 12, 20, 9, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SalatError::NoValidSource(_)));
}
