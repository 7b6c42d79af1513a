//! Monthly cache expiration, refresh and persistence.

use std::sync::Arc;

use salat::calendar::{CalendarCacheManager, CalendarDays, MonthlyCalendarCache, compute_expiration};
use salat::store::{KeyValueStore, MemoryStore, keys};

use crate::helpers::{
    CITY, ScriptedUpstream, at, date, gregorian_cache_json, hijri_cache_json, month,
};

#[test]
fn gregorian_expiration_is_the_last_date_key() {
    let cache =
        MonthlyCalendarCache::from_json_str(&gregorian_cache_json(date(2025, 12, 1), 29)).unwrap();
    assert!(cache.meta.expires_at.is_none());
    assert_eq!(
        compute_expiration(&cache, date(2025, 12, 20)),
        Some(date(2025, 12, 29))
    );
}

#[test]
fn legacy_hijri_expiration_counts_from_the_current_day() {
    let cache = MonthlyCalendarCache::from_json_str(&hijri_cache_json(29, 10)).unwrap();
    assert!(matches!(cache.days, CalendarDays::Hijri(_)));
    // Day 1 was 2025-12-11; day 29 is 2026-01-08.
    assert_eq!(
        compute_expiration(&cache, date(2025, 12, 20)),
        Some(date(2026, 1, 8))
    );
}

#[tokio::test]
async fn legacy_hijri_cache_comes_due_after_its_last_day() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(&keys::calendar(CITY), hijri_cache_json(29, 10))
        .await
        .unwrap();
    let manager = CalendarCacheManager::new(store.clone(), Arc::new(ScriptedUpstream::default()));

    assert!(!manager.should_refresh(CITY, at(2025, 12, 20, 2, 0)).await.unwrap());
    assert!(!manager.should_refresh(CITY, at(2026, 1, 7, 2, 0)).await.unwrap());
    assert!(manager.should_refresh(CITY, at(2026, 1, 8, 0, 0)).await.unwrap());
    assert!(manager.should_refresh(CITY, at(2026, 2, 15, 2, 0)).await.unwrap());
}

#[test]
fn reload_keeps_every_date() {
    let original =
        MonthlyCalendarCache::from_json_str(&gregorian_cache_json(date(2025, 12, 1), 31)).unwrap();
    let json = serde_json::to_string(&original).unwrap();
    let reloaded = MonthlyCalendarCache::from_json_str(&json).unwrap();

    for offset in 0..31 {
        let day = date(2025, 12, 1) + chrono::Duration::days(offset);
        assert_eq!(reloaded.day(day), original.day(day), "{day}");
    }
    assert_eq!(reloaded, original);
}

#[tokio::test]
async fn refresh_stores_cache_expiration_and_backup() {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));
    let manager = CalendarCacheManager::new(store.clone(), upstream.clone());
    let now = at(2025, 12, 20, 2, 0);

    let first = manager.refresh(CITY, now).await.unwrap();
    assert_eq!(first.expiration, date(2025, 12, 31));
    assert!(!first.backed_up);

    let second = manager.refresh(CITY, now).await.unwrap();
    assert!(second.backed_up);
    assert!(manager.load_previous(CITY).await.unwrap().is_some());

    let stored = store.get(&keys::monthly_expiration(CITY)).await.unwrap();
    assert_eq!(stored.as_deref(), Some("2025-12-31"));
    assert!(!manager.should_refresh(CITY, now).await.unwrap());
    assert!(manager.should_refresh(CITY, at(2025, 12, 31, 0, 0)).await.unwrap());
}

#[tokio::test]
async fn failed_refresh_deletes_cache_and_flags_city() {
    let store = Arc::new(MemoryStore::new());
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));
    let manager = CalendarCacheManager::new(store.clone(), upstream.clone());
    let now = at(2025, 12, 20, 2, 0);
    manager.refresh(CITY, now).await.unwrap();

    upstream.break_ministry();
    assert!(manager.refresh(CITY, now).await.is_err());

    assert!(!store.contains(&keys::calendar(CITY)).await.unwrap());
    assert!(manager.needs_refresh_flag(CITY).await.unwrap());
    assert!(manager.should_refresh(CITY, now).await.unwrap());
}

#[tokio::test]
async fn corrupt_cache_is_discarded_on_load() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(&keys::calendar(CITY), "{\"2025-12-01\": 7".into())
        .await
        .unwrap();
    let manager = CalendarCacheManager::new(store.clone(), Arc::new(ScriptedUpstream::default()));

    assert!(manager.load(CITY).await.unwrap().is_none());
    assert!(!store.contains(&keys::calendar(CITY)).await.unwrap());
}
