//! Every persisted key, in one place.
//!
//! City-scoped keys take the Ministry city id as suffix.

pub const BACKGROUND_TASKS_INITIALIZED: &str = "backgroundTasksInitialized";
pub const BACKGROUND_JOBS: &str = "backgroundJobs";

pub const NOTIFICATION_STATE: &str = "notificationState";
pub const ATHAN_SOUND_TYPE: &str = "athanSoundType";
pub const PRAYER_NOTIFICATION_STATES: &str = "prayerNotificationStates";
pub const REMINDER_NOTIFICATION_STATES: &str = "reminderNotificationStates";
pub const REMINDER_ENABLED: &str = "reminderEnabled";
pub const REMINDER_MINUTES: &str = "reminderMinutes";
pub const REMINDER_STATE: &str = "reminderState";
pub const ADVANCED_NOTIFICATION_MODE: &str = "advancedNotificationMode";

pub const WIDGET_PRAYER_DATA: &str = "widgetPrayerData";
pub const THEME_HUE: &str = "themeHue";
pub const IS_DARK_MODE: &str = "isDarkMode";
pub const BG_OPACITY: &str = "bgOpacity";
pub const PRAYER_SOURCE: &str = "prayerSource";

pub fn calendar(city_id: u32) -> String {
    format!("calendarData_{city_id}")
}

pub fn calendar_previous(city_id: u32) -> String {
    format!("calendarData_{city_id}_previous")
}

pub fn monthly_expiration(city_id: u32) -> String {
    format!("monthlyRefreshExpiration_{city_id}")
}

pub fn calendar_needs_refresh(city_id: u32) -> String {
    format!("calendarNeedsRefresh_{city_id}")
}

pub fn daily_times(city_id: u32) -> String {
    format!("daily_prayer_times_{city_id}")
}

pub fn last_good_snapshot(city_id: u32) -> String {
    format!("lastGoodSnapshot_{city_id}")
}
