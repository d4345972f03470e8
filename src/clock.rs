use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::{MINUTES_PER_DAY, Minutes};

/// Injectable time source. Everything that compares "now" against booking
/// times goes through this so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant, for tests.
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Resolve a booking's local wall time to a UTC instant. A minute value of
/// 1440 (24:00) rolls into the following day. Returns `None` for dates with
/// no valid local representation (DST gaps in zones that have them).
pub fn local_instant(date: NaiveDate, minutes: Minutes, tz: Tz) -> Option<DateTime<Utc>> {
    let (date, minutes) = if minutes >= MINUTES_PER_DAY {
        (date.succ_opt()?, minutes - MINUTES_PER_DAY)
    } else {
        (date, minutes)
    };
    let time = NaiveTime::from_hms_opt(u32::from(minutes) / 60, u32::from(minutes) % 60, 0)?;
    let local = tz.from_local_datetime(&date.and_time(time)).earliest()?;
    Some(local.with_timezone(&Utc))
}

/// Current local calendar date and minutes-since-midnight in `tz`.
pub fn local_today(clock: &dyn Clock, tz: Tz) -> (NaiveDate, Minutes) {
    use chrono::Timelike;
    let local = clock.now_utc().with_timezone(&tz);
    let minutes = (local.hour() * 60 + local.minute()) as Minutes;
    (local.date_naive(), minutes)
}
