//! The on-disk store behaves like the in-memory one.

use std::sync::Arc;

use salat::calendar::CalendarCacheManager;
use salat::store::{JsonFileStore, KeyValueStore, StoreExt, keys};

use crate::helpers::{CITY, ScriptedUpstream, at, date, month};

#[tokio::test]
async fn calendar_survives_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)));
    let now = at(2025, 12, 20, 2, 0);

    let first = CalendarCacheManager::new(Arc::new(JsonFileStore::new(dir.path())), upstream.clone());
    first.refresh(CITY, now).await.unwrap();
    let written = first.load(CITY).await.unwrap().unwrap();

    let second = CalendarCacheManager::new(Arc::new(JsonFileStore::new(dir.path())), upstream);
    let reloaded = second.load(CITY).await.unwrap().unwrap();
    assert_eq!(reloaded, written);
    assert_eq!(
        reloaded.day(date(2025, 12, 20)),
        written.day(date(2025, 12, 20))
    );
}

#[tokio::test]
async fn keys_map_to_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.set_bool(keys::BACKGROUND_TASKS_INITIALIZED, true).await.unwrap();
    store.set_json(&keys::daily_times(CITY), &"x").await.unwrap();
    store.remove(&keys::daily_times(CITY)).await.unwrap();
    store.remove("never-written").await.unwrap();

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 1);
    assert_eq!(
        store
            .get_bool(keys::BACKGROUND_TASKS_INITIALIZED)
            .await
            .unwrap(),
        Some(true)
    );
}
