use chrono::NaiveDate;

use crate::clock::local_today;
use crate::model::{Booking, BookingId, BookingStatus, Minutes, Room, RoomId, TimeRange};

use super::availability::{free_within, merge_ranges};
use super::{Engine, EngineError};

/// Free/busy picture of one room on one date. Only approved bookings count
/// as busy; pending requests are listed for information but never block slot
/// generation.
#[derive(Debug, Clone)]
pub struct RoomAvailability {
    pub date: NaiveDate,
    pub busy: Vec<TimeRange>,
    pub free: Vec<TimeRange>,
    pub start_slots: Vec<Minutes>,
    pub pending: Vec<Booking>,
}

impl Engine {
    pub async fn room(&self, id: RoomId) -> Result<Room, EngineError> {
        self.store.room(id).await?.ok_or(EngineError::NotFound(id))
    }

    pub async fn rooms(&self) -> Result<Vec<Room>, EngineError> {
        Ok(self.store.rooms().await?)
    }

    pub async fn booking(&self, id: BookingId) -> Result<Booking, EngineError> {
        self.must_get(id).await
    }

    pub async fn bookings_for(
        &self,
        room: RoomId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, EngineError> {
        self.store.room(room).await?.ok_or(EngineError::NotFound(room))?;
        Ok(self.store.bookings_for(room, date).await?)
    }

    /// Merged busy intervals, free gaps within the operating window, and the
    /// selectable start-time grid. Same-day queries drop start slots at or
    /// before the current wall clock in the deployment timezone.
    pub async fn availability(
        &self,
        room: RoomId,
        date: NaiveDate,
    ) -> Result<RoomAvailability, EngineError> {
        self.store.room(room).await?.ok_or(EngineError::NotFound(room))?;
        let all = self.store.bookings_for(room, date).await?;

        let busy = merge_ranges(
            all.iter()
                .filter(|b| b.status == BookingStatus::Approved)
                .map(|b| b.slot)
                .collect(),
        );
        let window = TimeRange::new(self.config.open, self.config.close);
        let free = free_within(window, &busy);

        let (today, now_mins) = local_today(self.clock.as_ref(), self.config.timezone);
        let not_before = (date == today).then_some(now_mins);
        let start_slots = self.grid.selectable_starts(window, &busy, not_before);

        let pending = all
            .into_iter()
            .filter(|b| b.status == BookingStatus::Pending)
            .collect();

        Ok(RoomAvailability {
            date,
            busy,
            free,
            start_slots,
            pending,
        })
    }

    /// End times a booking starting at `start` may pick on this room/date.
    pub async fn end_slots_for(
        &self,
        room: RoomId,
        date: NaiveDate,
        start: Minutes,
    ) -> Result<Vec<Minutes>, EngineError> {
        self.store.room(room).await?.ok_or(EngineError::NotFound(room))?;
        let all = self.store.bookings_for(room, date).await?;
        let busy = merge_ranges(
            all.iter()
                .filter(|b| b.status == BookingStatus::Approved)
                .map(|b| b.slot)
                .collect(),
        );
        let window = TimeRange::new(self.config.open, self.config.close);
        Ok(self.grid.selectable_ends(window, &busy, start))
    }
}
