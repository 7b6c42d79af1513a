//! End to end against a mocked Ministry server.

use std::sync::Arc;

use salat::notifications::MemoryNotificationSink;
use salat::store::{KeyValueStore, MemoryStore, keys};
use salat::{HttpUpstream, PrayerService, SalatConfig, SourceUsed};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{CITY, at, config, date, month_page};

async fn service_for(server: &MockServer, config: SalatConfig) -> (PrayerService, Arc<MemoryStore>) {
    let mut config = config;
    config.sources.upstream.ministry_url = format!("{}/prieres/horaire.php", server.uri());
    config.sources.upstream.timeout_seconds = 5;
    let store = Arc::new(MemoryStore::new());
    let upstream = HttpUpstream::new(config.sources.upstream.clone()).unwrap();
    let service = PrayerService::build(
        config,
        store.clone() as Arc<dyn KeyValueStore>,
        Arc::new(upstream),
        Arc::new(MemoryNotificationSink::new()),
    )
    .await
    .unwrap();
    (service, store)
}

#[tokio::test]
async fn ministry_page_feeds_today_then_the_monthly_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prieres/horaire.php"))
        .and(query_param("ville", CITY.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(month_page(date(2025, 12, 18), 10)))
        .mount(&server)
        .await;

    let (service, store) = service_for(&server, config()).await;
    let now = at(2025, 12, 20, 4, 0);

    let live = service.load_today(now).await.unwrap();
    assert_eq!(live.source_used, SourceUsed::Ministry);
    assert_eq!(live.times.fajr, "06:32");
    assert!(store.contains(&keys::daily_times(CITY)).await.unwrap());

    let refreshed = service.manual_refresh(now).await.unwrap();
    assert_eq!(refreshed.source_used, SourceUsed::MonthlyCache);
    assert_eq!(refreshed.times, live.times);
    assert_eq!(refreshed.tomorrow_fajr.as_deref(), Some("06:33"));
}

#[tokio::test]
async fn server_error_falls_back_to_local_calculation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prieres/horaire.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = config();
    config.location.latitude = Some(34.02);
    config.location.longitude = Some(-6.83);
    let (service, _store) = service_for(&server, config).await;

    let snapshot = service.load_today(at(2025, 12, 20, 4, 0)).await.unwrap();
    assert_eq!(snapshot.source_used, SourceUsed::Local);
    assert!(snapshot.is_valid());
}

#[tokio::test]
async fn server_error_without_coordinates_is_a_first_load_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (service, _store) = service_for(&server, config()).await;
    let err = service.load_today(at(2025, 12, 20, 4, 0)).await.unwrap_err();
    assert!(matches!(err, salat::SalatError::FirstLoadFailed(_)));
}
