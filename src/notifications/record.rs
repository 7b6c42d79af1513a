//! Alert records handed to the platform sink.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::notifications::state::NotificationState;
use crate::prayer::Prayer;

/// Base for athan identifiers; one per prayer.
const ATHAN_ID_BASE: i32 = 1;
/// Base for reminder identifiers. Countdown and killer share the value.
const REMINDER_ID_BASE: i32 = 100;
/// Identifier of tomorrow's Fajr athan when today is over.
pub const NEXT_DAY_FAJR_ID: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Athan,
    ReminderCountdown,
    ReminderKiller,
}

/// Stable identifier for a prayer's athan or reminder.
pub fn notification_id(prayer: Prayer, kind: NotificationKind) -> i32 {
    let index = i32::try_from(prayer.index()).unwrap_or(0);
    match kind {
        NotificationKind::Athan => ATHAN_ID_BASE + index,
        NotificationKind::ReminderCountdown | NotificationKind::ReminderKiller => {
            REMINDER_ID_BASE + index
        }
    }
}

/// Channel for an athan: category, state and sound variant.
pub fn athan_channel(state: NotificationState, sound: &str) -> String {
    format!("athan_{}_{sound}", state.as_str())
}

pub fn reminder_channel(state: NotificationState) -> String {
    format!("reminder_{}", state.as_str())
}

/// Silent channel used by reminder killers.
pub const KILLER_CHANNEL: &str = "reminder_killer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotificationRecord {
    pub id: i32,
    pub prayer: Prayer,
    pub kind: NotificationKind,
    /// Local wall-clock time the alert targets.
    pub target_time: NaiveDateTime,
    pub channel_id: String,
}

/// A record plus how it should be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub record: ScheduledNotificationRecord,
    pub title: String,
    pub body: String,
    /// Live countdown anchored to this instant, for reminder countdowns.
    pub countdown_to: Option<NaiveDateTime>,
    /// No sound, no vibration, no heads-up.
    pub silent: bool,
    /// Removes itself as soon as it is delivered.
    pub auto_dismiss: bool,
}

impl NotificationRequest {
    pub fn athan(
        prayer: Prayer,
        id: i32,
        target_time: NaiveDateTime,
        state: NotificationState,
        sound: &str,
    ) -> Self {
        Self {
            record: ScheduledNotificationRecord {
                id,
                prayer,
                kind: NotificationKind::Athan,
                target_time,
                channel_id: athan_channel(state, sound),
            },
            title: format!("{} {}", capitalize(prayer.key()), target_time.format("%H:%M")),
            body: format!("It is time for {}", capitalize(prayer.key())),
            countdown_to: None,
            silent: state == NotificationState::Silent,
            auto_dismiss: false,
        }
    }

    pub fn reminder_countdown(
        prayer: Prayer,
        prayer_time: NaiveDateTime,
        minutes: u32,
        state: NotificationState,
    ) -> Self {
        Self {
            record: ScheduledNotificationRecord {
                id: notification_id(prayer, NotificationKind::ReminderCountdown),
                prayer,
                kind: NotificationKind::ReminderCountdown,
                target_time: prayer_time,
                channel_id: reminder_channel(state),
            },
            title: format!("{} in {minutes} min", capitalize(prayer.key())),
            body: format!("{} at {}", capitalize(prayer.key()), prayer_time.format("%H:%M")),
            countdown_to: Some(prayer_time),
            silent: state == NotificationState::Silent,
            auto_dismiss: false,
        }
    }

    pub fn reminder_killer(prayer: Prayer, prayer_time: NaiveDateTime) -> Self {
        Self {
            record: ScheduledNotificationRecord {
                id: notification_id(prayer, NotificationKind::ReminderKiller),
                prayer,
                kind: NotificationKind::ReminderKiller,
                target_time: prayer_time,
                channel_id: KILLER_CHANNEL.to_owned(),
            },
            title: String::new(),
            body: String::new(),
            countdown_to: None,
            silent: true,
            auto_dismiss: true,
        }
    }

    pub fn id(&self) -> i32 {
        self.record.id
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_across_prayers_and_shared_by_reminder_pair() {
        let mut athan: Vec<i32> = Prayer::ALL
            .iter()
            .map(|p| notification_id(*p, NotificationKind::Athan))
            .collect();
        athan.dedup();
        assert_eq!(athan.len(), 6);
        for prayer in Prayer::ALL {
            assert_eq!(
                notification_id(prayer, NotificationKind::ReminderCountdown),
                notification_id(prayer, NotificationKind::ReminderKiller)
            );
            assert_ne!(
                notification_id(prayer, NotificationKind::Athan),
                notification_id(prayer, NotificationKind::ReminderKiller)
            );
            assert_ne!(notification_id(prayer, NotificationKind::Athan), NEXT_DAY_FAJR_ID);
        }
    }

    #[test]
    fn channels_encode_state_and_sound() {
        assert_eq!(athan_channel(NotificationState::Vibrate, "makkah"), "athan_vibrate_makkah");
        assert_eq!(reminder_channel(NotificationState::Silent), "reminder_silent");
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("maghrib"), "Maghrib");
        assert_eq!(capitalize(""), "");
    }
}
