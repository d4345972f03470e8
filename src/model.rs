use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub type RoomId = Ulid;
pub type UserId = Ulid;
pub type BookingId = Ulid;

/// Minutes since midnight — the only intra-day time type.
pub type Minutes = u16;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Parse `"HH:MM"` into minutes since midnight. `"24:00"` is accepted as the
/// end-of-day boundary.
pub fn minutes_from_str(s: &str) -> Option<Minutes> {
    let (h, m) = s.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if m >= 60 {
        return None;
    }
    let total = h.checked_mul(60)?.checked_add(m)?;
    (total <= MINUTES_PER_DAY).then_some(total)
}

pub fn minutes_to_str(m: Minutes) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Half-open interval `[start, end)` in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Minutes,
    pub end: Minutes,
}

impl TimeRange {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    pub fn duration_mins(&self) -> Minutes {
        self.end - self.start
    }

    /// Half-open overlap: touching endpoints do NOT overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, t: Minutes) -> bool {
        self.start <= t && t < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", minutes_to_str(self.start), minutes_to_str(self.end))
    }
}

// Wire format is "HH:MM" strings on both ends, matching what selection UIs
// render. Ordering is validated at the engine boundary, not here.
impl Serialize for TimeRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("TimeRange", 2)?;
        st.serialize_field("start", &minutes_to_str(self.start))?;
        st.serialize_field("end", &minutes_to_str(self.end))?;
        st.end()
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            start: String,
            end: String,
        }
        let repr = Repr::deserialize(deserializer)?;
        let start = minutes_from_str(&repr.start)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time {:?}", repr.start)))?;
        let end = minutes_from_str(&repr.end)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time {:?}", repr.end)))?;
        Ok(TimeRange { start, end })
    }
}

// ── Rooms ────────────────────────────────────────────────────────

/// Informational room state. Never consulted for conflict detection; that is
/// derived from the approved bookings themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    FullyBooked,
    Maintenance,
    NotApplicable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub status: RoomStatus,
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    RejectedByAdmin,
    Cancelled,
    CancelledNotApprovedBeforeStart,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::RejectedByAdmin => "rejected_by_admin",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::CancelledNotApprovedBeforeStart => {
                "cancelled_not_approved_before_start"
            }
        }
    }

    /// Terminal states admit no further transitions. `Approved` is not
    /// terminal here: it is removed by the expiry sweep and may still be
    /// cancelled or re-opened by an owner edit.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::RejectedByAdmin
                | BookingStatus::Cancelled
                | BookingStatus::CancelledNotApprovedBeforeStart
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reservation occurrence: a single room on a single calendar date.
/// Recurring requests expand into one row per matched date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub date: NaiveDate,
    pub slot: TimeRange,
    pub reserved_by: String,
    pub user_id: UserId,
    /// Admin who created the booking on behalf of `user_id`, if any.
    pub assigned_by: Option<UserId>,
    pub email: String,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub approved_at: Option<DateTime<Utc>>,
    /// Also stamps cancellations and auto-expiry; read via
    /// [`Booking::status_changed_at`] rather than directly.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Also stores the `"approved"` audit marker; read via
    /// [`Booking::status_note`] rather than directly.
    pub reject_reason: Option<String>,
}

impl Booking {
    /// When the current status was entered. `rejected_at` doubles as the
    /// cancellation and auto-expiry timestamp; this accessor hides that.
    pub fn status_changed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            BookingStatus::Pending => None,
            BookingStatus::Approved => self.approved_at,
            BookingStatus::RejectedByAdmin
            | BookingStatus::Cancelled
            | BookingStatus::CancelledNotApprovedBeforeStart => self.rejected_at,
        }
    }

    /// Human-readable reason attached to the current status. The `"approved"`
    /// marker written into `reject_reason` on approval is an audit artifact,
    /// not a note, and is filtered out here.
    pub fn status_note(&self) -> Option<&str> {
        match self.status {
            BookingStatus::Approved | BookingStatus::Pending => None,
            _ => self.reject_reason.as_deref(),
        }
    }
}

// ── Actors ───────────────────────────────────────────────────────

/// Caller identity plus capabilities resolved by the upstream authorization
/// layer. The engine never inspects roles, only these grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub can_approve_bookings: bool,
    pub can_act_as_other_user: bool,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            can_approve_bookings: false,
            can_act_as_other_user: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            can_approve_bookings: true,
            can_act_as_other_user: true,
        }
    }
}
