use chrono::NaiveDate;
use ulid::Ulid;

use crate::clock::local_instant;
use crate::model::{Actor, Booking, BookingId, BookingStatus, Room, TimeRange, UserId};
use crate::notify::NotificationKind;
use crate::observability;
use crate::recurrence::Recurrence;

use super::conflict::{
    self, APPROVED_MARKER, AUTO_REJECT_REASON, DEFAULT_REJECT_REASON, check_no_approved_overlap,
    overlapping_pending,
};
use super::{Engine, EngineError};

/// A booking submission, single or recurring. Expands into one row per
/// occurrence date.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub room_id: crate::model::RoomId,
    pub recurrence: Recurrence,
    pub slot: TimeRange,
    pub reserved_by: String,
    pub user_id: UserId,
    pub email: String,
    pub notes: Option<String>,
}

/// Owner edit. Only the provided fields change; an empty notes string clears
/// the notes.
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeRange>,
    pub notes: Option<String>,
}

impl Engine {
    /// Register a room. Rooms are plumbing here: the engine only needs them
    /// to exist so bookings have something to reference.
    pub async fn register_room(&self, actor: &Actor, room: Room) -> Result<Room, EngineError> {
        if !actor.can_approve_bookings {
            return Err(EngineError::AuthorizationDenied(
                "registering rooms requires an administrator".into(),
            ));
        }
        self.store.put_room(room.clone()).await?;
        tracing::info!(room = %room.id, number = %room.number, "room registered");
        Ok(room)
    }

    /// Validate a booking request, expand its recurrence, and persist one row
    /// per occurrence.
    ///
    /// Admin-originated submissions target `Approved` and are conflict-checked
    /// against existing approved bookings for EVERY occurrence before any row
    /// is written; a mid-sequence conflict fails the whole submission with
    /// nothing inserted. Self-service submissions target `Pending` and are
    /// never conflict-checked here; conflicts are enforced at approval time.
    pub async fn submit(
        &self,
        actor: &Actor,
        req: BookingRequest,
    ) -> Result<Vec<Booking>, EngineError> {
        conflict::validate_slot(&self.config, &req.slot)?;
        conflict::validate_notes(&self.config, req.notes.as_deref())?;
        conflict::validate_contact(&req.reserved_by, &req.email)?;
        if req.user_id != actor.user_id && !actor.can_act_as_other_user {
            return Err(EngineError::AuthorizationDenied(
                "booking on behalf of another user requires the assign capability".into(),
            ));
        }
        self.store
            .room(req.room_id)
            .await?
            .ok_or(EngineError::NotFound(req.room_id))?;

        let dates = req.recurrence.expand()?;
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let target = if actor.can_approve_bookings {
            BookingStatus::Approved
        } else {
            BookingStatus::Pending
        };

        // Serialize against every touched (room, date) key for the whole
        // check-then-insert sequence. expand() yields ascending dates, and
        // lock_days re-sorts anyway.
        let _guards = self.lock_days(req.room_id, &dates).await;

        if target == BookingStatus::Approved {
            for &date in &dates {
                let existing = self.store.bookings_for(req.room_id, date).await?;
                check_no_approved_overlap(&existing, &req.slot, date, None)?;
            }
        }

        let now = self.clock.now_utc();
        let assigned_by = (req.user_id != actor.user_id).then_some(actor.user_id);
        let mut created = Vec::with_capacity(dates.len());
        for &date in &dates {
            let booking = Booking {
                id: Ulid::new(),
                room_id: req.room_id,
                date,
                slot: req.slot,
                reserved_by: req.reserved_by.clone(),
                user_id: req.user_id,
                assigned_by,
                email: req.email.clone(),
                notes: req.notes.clone(),
                status: target,
                approved_at: (target == BookingStatus::Approved).then_some(now),
                rejected_at: None,
                reject_reason: None,
            };
            self.store.insert_booking(booking.clone()).await?;
            metrics::counter!(observability::BOOKINGS_SUBMITTED_TOTAL, "status" => target.as_str())
                .increment(1);
            tracing::info!(
                booking = %booking.id,
                room = %booking.room_id,
                date = %booking.date,
                slot = %booking.slot,
                status = %target,
                "booking created"
            );
            if target == BookingStatus::Approved {
                self.cascade_reject(&booking).await?;
                self.notify.notify(&booking, NotificationKind::Approved);
            }
            created.push(booking);
        }
        Ok(created)
    }

    /// Approve a pending booking. Conflict-checked against approved siblings
    /// under the (room, date) lock, then overlapping pending bookings are
    /// auto-rejected.
    pub async fn approve(&self, actor: &Actor, id: BookingId) -> Result<Booking, EngineError> {
        if !actor.can_approve_bookings {
            return Err(EngineError::AuthorizationDenied(
                "approving bookings requires an administrator".into(),
            ));
        }
        let found = self.must_get(id).await?;
        let _guard = self.lock_day(found.room_id, found.date).await;
        // Re-read under the lock: the row may have changed while we waited.
        let mut booking = self.must_get(id).await?;
        match booking.status {
            BookingStatus::Pending => {}
            other => {
                return Err(EngineError::ValidationFailed(format!(
                    "only pending bookings can be approved (status: {other})"
                )));
            }
        }

        let existing = self.store.bookings_for(booking.room_id, booking.date).await?;
        check_no_approved_overlap(&existing, &booking.slot, booking.date, Some(booking.id))?;

        booking.status = BookingStatus::Approved;
        booking.approved_at = Some(self.clock.now_utc());
        booking.reject_reason = Some(APPROVED_MARKER.into());
        self.store.update_booking(booking.clone()).await?;
        tracing::info!(booking = %booking.id, room = %booking.room_id, "booking approved");

        self.cascade_reject(&booking).await?;
        self.notify.notify(&booking, NotificationKind::Approved);
        Ok(booking)
    }

    /// Reject a pending booking with an optional reason.
    pub async fn reject(
        &self,
        actor: &Actor,
        id: BookingId,
        reason: Option<String>,
    ) -> Result<Booking, EngineError> {
        if !actor.can_approve_bookings {
            return Err(EngineError::AuthorizationDenied(
                "rejecting bookings requires an administrator".into(),
            ));
        }
        let found = self.must_get(id).await?;
        let _guard = self.lock_day(found.room_id, found.date).await;
        let mut booking = self.must_get(id).await?;
        match booking.status {
            BookingStatus::Pending => {}
            other => {
                return Err(EngineError::ValidationFailed(format!(
                    "only pending bookings can be rejected (status: {other})"
                )));
            }
        }

        booking.status = BookingStatus::RejectedByAdmin;
        booking.rejected_at = Some(self.clock.now_utc());
        booking.reject_reason = Some(reason.unwrap_or_else(|| DEFAULT_REJECT_REASON.into()));
        self.store.update_booking(booking.clone()).await?;
        tracing::info!(booking = %booking.id, room = %booking.room_id, "booking rejected");

        self.notify.notify(&booking, NotificationKind::Rejected);
        Ok(booking)
    }

    /// Cancel a booking. The reason is mandatory. Admins may cancel anything;
    /// owners only their own bookings, and only while the start time is at
    /// least the configured window away.
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: BookingId,
        reason: &str,
    ) -> Result<Booking, EngineError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::ValidationFailed(
                "a cancellation reason is required".into(),
            ));
        }
        let found = self.must_get(id).await?;
        let _guard = self.lock_day(found.room_id, found.date).await;
        let mut booking = self.must_get(id).await?;
        if booking.status.is_terminal() {
            return Err(EngineError::ValidationFailed(format!(
                "booking is already {}",
                booking.status
            )));
        }
        if !actor.can_approve_bookings {
            if booking.user_id != actor.user_id {
                return Err(EngineError::AuthorizationDenied(
                    "only the booking owner or an administrator may cancel".into(),
                ));
            }
            if !self.starts_far_enough_ahead(&booking) {
                return Err(EngineError::AuthorizationDenied(format!(
                    "bookings may only be cancelled at least {} minutes before the start time",
                    self.config.cancel_window_mins
                )));
            }
        }

        booking.status = BookingStatus::Cancelled;
        booking.rejected_at = Some(self.clock.now_utc());
        booking.reject_reason = Some(reason.to_string());
        self.store.update_booking(booking.clone()).await?;
        tracing::info!(booking = %booking.id, room = %booking.room_id, "booking cancelled");

        self.notify.notify(&booking, NotificationKind::Cancelled);
        Ok(booking)
    }

    /// Whether `actor` may cancel `booking` right now. Mirrors the checks in
    /// [`Engine::cancel`] for UI listings.
    pub fn is_cancelable(&self, booking: &Booking, actor: &Actor) -> bool {
        if booking.status.is_terminal() {
            return false;
        }
        if actor.can_approve_bookings {
            return true;
        }
        booking.user_id == actor.user_id && self.starts_far_enough_ahead(booking)
    }

    fn starts_far_enough_ahead(&self, booking: &Booking) -> bool {
        let Some(start) = local_instant(booking.date, booking.slot.start, self.config.timezone)
        else {
            return false;
        };
        start - self.clock.now_utc() >= chrono::Duration::minutes(self.config.cancel_window_mins)
    }

    /// Owner edit: change date/time/notes and reset the status to `Pending`
    /// so the booking goes back through approval. Runs NO conflict detection;
    /// conflicts are enforced only when an admin approves.
    pub async fn update(
        &self,
        actor: &Actor,
        id: BookingId,
        changes: BookingChanges,
    ) -> Result<Booking, EngineError> {
        let found = self.must_get(id).await?;
        if found.user_id != actor.user_id && !actor.can_approve_bookings {
            return Err(EngineError::AuthorizationDenied(
                "only the booking owner or an administrator may edit".into(),
            ));
        }

        let mut dates = vec![found.date];
        if let Some(new_date) = changes.date {
            dates.push(new_date);
        }
        let _guards = self.lock_days(found.room_id, &dates).await;
        let mut booking = self.must_get(id).await?;

        if let Some(date) = changes.date {
            booking.date = date;
        }
        if let Some(slot) = changes.slot {
            conflict::validate_slot(&self.config, &slot)?;
            booking.slot = slot;
        }
        if let Some(notes) = changes.notes {
            conflict::validate_notes(&self.config, Some(&notes))?;
            booking.notes = (!notes.trim().is_empty()).then_some(notes);
        }

        booking.status = BookingStatus::Pending;
        booking.approved_at = None;
        booking.rejected_at = None;
        booking.reject_reason = None;
        self.store.update_booking(booking.clone()).await?;
        tracing::info!(booking = %booking.id, room = %booking.room_id, "booking edited, back to pending");
        Ok(booking)
    }

    /// Explicit row removal, distinct from the sweep's expiry purge.
    pub async fn delete(&self, actor: &Actor, id: BookingId) -> Result<Booking, EngineError> {
        if !actor.can_approve_bookings {
            return Err(EngineError::AuthorizationDenied(
                "deleting bookings requires an administrator".into(),
            ));
        }
        let found = self.must_get(id).await?;
        let _guard = self.lock_day(found.room_id, found.date).await;
        self.store
            .delete_booking(id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    /// Reject every pending booking on the same room/date overlapping a
    /// newly approved interval.
    async fn cascade_reject(&self, approved: &Booking) -> Result<Vec<Booking>, EngineError> {
        let existing = self.store.bookings_for(approved.room_id, approved.date).await?;
        let victims = overlapping_pending(&existing, &approved.slot, approved.id);
        let now = self.clock.now_utc();
        let mut rejected = Vec::with_capacity(victims.len());
        for mut victim in victims {
            victim.status = BookingStatus::RejectedByAdmin;
            victim.rejected_at = Some(now);
            victim.reject_reason = Some(AUTO_REJECT_REASON.into());
            self.store.update_booking(victim.clone()).await?;
            metrics::counter!(observability::BOOKINGS_AUTO_REJECTED_TOTAL).increment(1);
            tracing::info!(
                booking = %victim.id,
                overlapping = %approved.id,
                "pending booking auto-rejected"
            );
            self.notify.notify(&victim, NotificationKind::AutoRejected);
            rejected.push(victim);
        }
        Ok(rejected)
    }

    // ── Expiry sweeps ────────────────────────────────────────────

    /// Cancel pending bookings whose start time fell inside the window since
    /// the previous successful sweep. The watermark bounds the window on both
    /// sides: rows already handled are not reprocessed, and a delayed sweep
    /// still covers everything since the last success. Advanced only after
    /// the whole window is processed.
    pub async fn expire_overdue_pending(&self) -> Result<Vec<Booking>, EngineError> {
        let now = self.clock.now_utc();
        let Some(last) = self.store.watermark().await? else {
            // First tick after deploy: establish the watermark, nothing to do.
            self.store.set_watermark(now).await?;
            return Ok(Vec::new());
        };

        let pending = self
            .store
            .bookings_with_status(BookingStatus::Pending)
            .await?;
        let mut expired = Vec::new();
        for candidate in pending {
            let Some(start) =
                local_instant(candidate.date, candidate.slot.start, self.config.timezone)
            else {
                continue;
            };
            if start <= last || start > now {
                continue;
            }
            let _guard = self.lock_day(candidate.room_id, candidate.date).await;
            let Some(mut booking) = self.store.booking(candidate.id).await? else {
                continue;
            };
            if booking.status != BookingStatus::Pending {
                // Approved or resolved while we were scanning.
                continue;
            }
            booking.status = BookingStatus::CancelledNotApprovedBeforeStart;
            booking.rejected_at = Some(now);
            booking.reject_reason = Some("not approved before the scheduled start".into());
            self.store.update_booking(booking.clone()).await?;
            metrics::counter!(observability::SWEEP_EXPIRED_PENDING_TOTAL).increment(1);
            tracing::info!(booking = %booking.id, "pending booking expired unapproved");
            self.notify
                .notify(&booking, NotificationKind::CancelledNotApprovedBeforeStart);
            expired.push(booking);
        }

        self.store.set_watermark(now).await?;
        Ok(expired)
    }

    /// Remove approved bookings whose end time has fully elapsed. Not
    /// watermark-gated: these are terminal removals, so re-running over the
    /// same rows is naturally idempotent.
    pub async fn purge_elapsed_approved(&self) -> Result<Vec<Booking>, EngineError> {
        let now = self.clock.now_utc();
        let approved = self
            .store
            .bookings_with_status(BookingStatus::Approved)
            .await?;
        let mut purged = Vec::new();
        for candidate in approved {
            let Some(end) = local_instant(candidate.date, candidate.slot.end, self.config.timezone)
            else {
                continue;
            };
            if end > now {
                continue;
            }
            let _guard = self.lock_day(candidate.room_id, candidate.date).await;
            if let Some(booking) = self.store.delete_booking(candidate.id).await? {
                metrics::counter!(observability::SWEEP_PURGED_APPROVED_TOTAL).increment(1);
                tracing::debug!(booking = %booking.id, "elapsed approved booking purged");
                purged.push(booking);
            }
        }
        Ok(purged)
    }
}
