//! Notification rebuilds driven through the foreground service.

use salat::notifications::record::notification_id;
use salat::notifications::{AlarmMode, NotificationKind, NotificationState};
use salat::{Prayer, SourceUsed};

use crate::helpers::{ScriptedUpstream, at, config, date, harness, month};

#[tokio::test]
async fn rescheduling_twice_leaves_the_same_pending_set() {
    let h = harness(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)), config()).await;
    h.service
        .settings()
        .update(|s| {
            s.notifications.reminder_enabled = true;
            s.notifications.reminder_minutes = 10;
        })
        .await
        .unwrap();
    let now = at(2025, 12, 20, 5, 0);

    h.service.refresh_today(now).await.unwrap();
    let once: Vec<i32> = h.sink.pending().iter().map(|(n, _)| n.id()).collect();

    h.service.refresh_today(now).await.unwrap();
    let twice: Vec<i32> = h.sink.pending().iter().map(|(n, _)| n.id()).collect();

    assert_eq!(once, twice);
    assert_eq!(h.sink.pending_count(), 12);
}

#[tokio::test]
async fn countdown_is_gone_once_the_prayer_arrives() {
    let h = harness(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)), config()).await;
    h.service
        .settings()
        .update(|s| {
            s.notifications.reminder_enabled = true;
            s.notifications.reminder_minutes = 15;
        })
        .await
        .unwrap();
    h.service.refresh_today(at(2025, 12, 20, 15, 0)).await.unwrap();

    let id = notification_id(Prayer::Asr, NotificationKind::ReminderCountdown);
    assert!(
        h.sink
            .displayed()
            .iter()
            .any(|n| n.id() == id && n.countdown_to == Some(at(2025, 12, 20, 15, 50)))
    );
    let killer = h
        .sink
        .pending()
        .into_iter()
        .find(|(n, _)| n.id() == id)
        .map(|(n, _)| n)
        .expect("killer pending under the countdown id");
    assert_eq!(killer.record.kind, NotificationKind::ReminderKiller);
    assert_eq!(killer.record.target_time, at(2025, 12, 20, 15, 50));

    h.sink.advance_to(at(2025, 12, 20, 15, 50));
    assert!(
        !h.sink
            .displayed()
            .iter()
            .any(|n| n.id() == id && n.countdown_to.is_some())
    );
}

#[tokio::test]
async fn advanced_mode_uses_per_prayer_states() {
    let h = harness(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)), config()).await;
    h.service
        .settings()
        .update(|s| {
            s.notifications.advanced_mode = true;
            s.notifications.athan.global = NotificationState::Off;
            s.notifications
                .athan
                .per_prayer
                .insert(Prayer::Maghrib, NotificationState::Vibrate);
        })
        .await
        .unwrap();

    let snapshot = h.service.refresh_today(at(2025, 12, 20, 12, 0)).await.unwrap();
    assert_eq!(snapshot.source_used, SourceUsed::Ministry);

    let pending = h.sink.pending();
    assert_eq!(pending.len(), 1);
    let (athan, mode) = &pending[0];
    assert_eq!(athan.record.prayer, Prayer::Maghrib);
    assert_eq!(athan.record.channel_id, "athan_vibrate_default");
    assert_eq!(*mode, AlarmMode::Exact);
}

#[tokio::test]
async fn missing_exact_permission_degrades_every_prayer() {
    let h = harness(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31)), config()).await;
    h.sink.reject_exact_alarms(true);

    h.service.refresh_today(at(2025, 12, 20, 12, 0)).await.unwrap();
    let pending = h.sink.pending();
    assert_eq!(pending.len(), 4);
    assert!(
        pending
            .iter()
            .all(|(_, mode)| *mode == AlarmMode::InexactAllowWhileIdle)
    );
}
