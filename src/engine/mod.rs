mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::{SlotGrid, free_within, merge_ranges, slot_is_free};
pub use conflict::{AUTO_REJECT_REASON, DEFAULT_REJECT_REASON};
pub use error::EngineError;
pub use mutations::{BookingChanges, BookingRequest};
pub use queries::RoomAvailability;

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::model::{Booking, BookingId, RoomId};
use crate::notify::NotifyHub;
use crate::store::BookingStore;

/// The booking engine. Holds the conflict-resolution state machine together:
/// persistence behind [`BookingStore`], an injectable [`Clock`], the schedule
/// configuration, the notification hub, and the per-(room, date) lock
/// registry that serializes every check-then-act sequence.
pub struct Engine {
    pub(super) store: Arc<dyn BookingStore>,
    pub(super) clock: Arc<dyn Clock>,
    pub config: ScheduleConfig,
    pub notify: Arc<NotifyHub>,
    pub(super) grid: SlotGrid,
    /// Advisory locks keyed by (room, date). Two concurrent approvals for
    /// overlapping intervals on the same key cannot both pass the overlap
    /// check; cross-room and cross-date operations proceed in parallel.
    day_locks: DashMap<(RoomId, NaiveDate), Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        config: ScheduleConfig,
        notify: Arc<NotifyHub>,
    ) -> Self {
        let grid = SlotGrid::generate(&config);
        Self {
            store,
            clock,
            config,
            notify,
            grid,
            day_locks: DashMap::new(),
        }
    }

    fn day_lock(&self, room: RoomId, date: NaiveDate) -> Arc<Mutex<()>> {
        self.day_locks
            .entry((room, date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Lock one (room, date) key.
    pub(super) async fn lock_day(&self, room: RoomId, date: NaiveDate) -> OwnedMutexGuard<()> {
        self.day_lock(room, date).lock_owned().await
    }

    /// Lock several dates for one room. Dates are taken in ascending order so
    /// two multi-date submissions over the same room cannot deadlock.
    pub(super) async fn lock_days(
        &self,
        room: RoomId,
        dates: &[NaiveDate],
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<NaiveDate> = dates.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for date in sorted {
            guards.push(self.lock_day(room, date).await);
        }
        guards
    }

    /// Fetch a booking or fail with `NotFound`.
    pub(super) async fn must_get(&self, id: BookingId) -> Result<Booking, EngineError> {
        self.store
            .booking(id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }
}
