use chrono_tz::Tz;

use crate::model::{Minutes, minutes_from_str};

/// Scheduling parameters for a deployment. The reference deployment books
/// rooms between 07:00 and 13:00 local time in a single pinned timezone.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub timezone: Tz,
    /// Operating window, minutes since midnight, half-open.
    pub open: Minutes,
    pub close: Minutes,
    /// Owners may cancel only this many minutes before the start time.
    pub cancel_window_mins: i64,
    pub notes_max_len: usize,
    /// Bookable start times, as minute offsets past each hour. Starts sit one
    /// minute after the previous block's end so an end at HH:15 and a start
    /// at HH:16 never share a minute.
    pub slot_start_offsets: Vec<Minutes>,
    /// Bookable end times, as minute offsets past each hour (60 = next hour).
    pub slot_end_offsets: Vec<Minutes>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Manila,
            open: 7 * 60,
            close: 13 * 60,
            cancel_window_mins: 30,
            notes_max_len: 250,
            slot_start_offsets: vec![1, 16, 31, 46],
            slot_end_offsets: vec![15, 30, 45, 60],
        }
    }
}

impl ScheduleConfig {
    /// Build from `ROOMD_*` environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timezone = std::env::var("ROOMD_TIMEZONE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timezone);
        let open = std::env::var("ROOMD_OPEN")
            .ok()
            .and_then(|s| minutes_from_str(&s))
            .unwrap_or(defaults.open);
        let close = std::env::var("ROOMD_CLOSE")
            .ok()
            .and_then(|s| minutes_from_str(&s))
            .unwrap_or(defaults.close);
        let cancel_window_mins = std::env::var("ROOMD_CANCEL_WINDOW_MINS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cancel_window_mins);
        let notes_max_len = std::env::var("ROOMD_NOTES_MAX_LEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.notes_max_len);
        Self {
            timezone,
            open,
            close,
            cancel_window_mins,
            notes_max_len,
            ..defaults
        }
    }
}
