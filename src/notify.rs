use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Booking, RoomId};

const CHANNEL_CAPACITY: usize = 256;

/// Event types handed to the notification collaborator. Wire names preserve
/// the externally observed spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "autoRejected")]
    AutoRejected,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "cancelled_not_approved_before_start")]
    CancelledNotApprovedBeforeStart,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingNotification {
    pub kind: NotificationKind,
    pub booking: Booking,
}

/// Broadcast hub with one channel per room. Sends are fire-and-forget: a
/// failure or an empty audience never surfaces as a booking-operation error.
pub struct NotifyHub {
    channels: DashMap<RoomId, broadcast::Sender<BookingNotification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to notifications for a room. Creates the channel if needed.
    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<BookingNotification> {
        let sender = self
            .channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn notify(&self, booking: &Booking, kind: NotificationKind) {
        tracing::debug!(
            booking = %booking.id,
            room = %booking.room_id,
            ?kind,
            "notification"
        );
        metrics::counter!(crate::observability::NOTIFICATIONS_SENT_TOTAL).increment(1);
        if let Some(sender) = self.channels.get(&booking.room_id) {
            let _ = sender.send(BookingNotification {
                kind,
                booking: booking.clone(),
            });
        }
    }

    /// Remove a channel (e.g. when a room is retired).
    #[allow(dead_code)]
    pub fn remove(&self, room_id: &RoomId) {
        self.channels.remove(room_id);
    }
}
