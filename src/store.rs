use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::{Booking, BookingId, BookingStatus, Room, RoomId};

/// Failure surfaced by a storage backend. The in-memory store never errors;
/// a relational backend maps its driver errors through here.
#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// The narrow persistence interface the engine consumes. A transactional
/// relational implementation is a drop-in; atomicity of check-then-act
/// sequences is provided by the engine's per-(room, date) locks, so the
/// store only needs per-call consistency.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn put_room(&self, room: Room) -> Result<(), StoreError>;
    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;
    async fn rooms(&self) -> Result<Vec<Room>, StoreError>;

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError>;
    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;
    /// Replace the stored row with the same id. Unknown ids are a no-op; the
    /// engine always fetches before updating.
    async fn update_booking(&self, booking: Booking) -> Result<(), StoreError>;
    async fn delete_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// All bookings for one room on one date, ascending by start time.
    async fn bookings_for(&self, room: RoomId, date: NaiveDate)
    -> Result<Vec<Booking>, StoreError>;
    /// All bookings in a status, ascending by (date, start time). Used by the
    /// expiry sweep.
    async fn bookings_with_status(&self, status: BookingStatus)
    -> Result<Vec<Booking>, StoreError>;

    /// Singleton sweep watermark: upper bound of the last successfully
    /// processed pending-expiry window.
    async fn watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn set_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError>;
}

// ── In-memory implementation ─────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomId, Room>,
    bookings: DashMap<BookingId, Booking>,
    watermark: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn put_room(&self, room: Room) -> Result<(), StoreError> {
        self.rooms.insert(room.id, room);
        Ok(())
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(&id).map(|e| e.value().clone()))
    }

    async fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn update_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn delete_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.remove(&id).map(|(_, b)| b))
    }

    async fn bookings_for(
        &self,
        room: RoomId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().room_id == room && e.value().date == date)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|b| b.slot.start);
        Ok(rows)
    }

    async fn bookings_with_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().status == status)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|b| (b.date, b.slot.start));
        Ok(rows)
    }

    async fn watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(*self.watermark.read().await)
    }

    async fn set_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        *self.watermark.write().await = Some(at);
        Ok(())
    }
}
