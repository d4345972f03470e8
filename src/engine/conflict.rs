use chrono::NaiveDate;

use crate::config::ScheduleConfig;
use crate::model::{Booking, BookingStatus, TimeRange};

use super::EngineError;

/// Reason stamped onto pending bookings rejected by an approval cascade.
pub const AUTO_REJECT_REASON: &str = "Overlapping with another approved reservation";

/// Default reason for an explicit admin rejection.
pub const DEFAULT_REJECT_REASON: &str = "rejected by admin";

/// Audit marker written into `reject_reason` when a booking is approved.
pub(super) const APPROVED_MARKER: &str = "approved";

pub(super) fn validate_slot(cfg: &ScheduleConfig, slot: &TimeRange) -> Result<(), EngineError> {
    if slot.start >= slot.end {
        return Err(EngineError::ValidationFailed(
            "start time must be before end time".into(),
        ));
    }
    if slot.start < cfg.open || slot.end > cfg.close {
        return Err(EngineError::ValidationFailed(format!(
            "requested time falls outside the operating window {}-{}",
            crate::model::minutes_to_str(cfg.open),
            crate::model::minutes_to_str(cfg.close),
        )));
    }
    Ok(())
}

pub(super) fn validate_notes(
    cfg: &ScheduleConfig,
    notes: Option<&str>,
) -> Result<(), EngineError> {
    if let Some(notes) = notes
        && notes.len() > cfg.notes_max_len
    {
        return Err(EngineError::ValidationFailed(format!(
            "notes exceed {} characters",
            cfg.notes_max_len
        )));
    }
    Ok(())
}

pub(super) fn validate_contact(reserved_by: &str, email: &str) -> Result<(), EngineError> {
    if reserved_by.trim().is_empty() {
        return Err(EngineError::ValidationFailed(
            "reserved_by is required".into(),
        ));
    }
    if email.trim().is_empty() {
        return Err(EngineError::ValidationFailed("email is required".into()));
    }
    Ok(())
}

/// Approval-path conflict test: any approved booking on the same room/date
/// overlapping `slot` (other than `exclude`) fails with a `Conflict` naming
/// the date.
pub(super) fn check_no_approved_overlap(
    existing: &[Booking],
    slot: &TimeRange,
    date: NaiveDate,
    exclude: Option<crate::model::BookingId>,
) -> Result<(), EngineError> {
    for b in existing {
        if b.status == BookingStatus::Approved
            && Some(b.id) != exclude
            && b.slot.overlaps(slot)
        {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::Conflict { date });
        }
    }
    Ok(())
}

/// Pending bookings on the same room/date that overlap a newly approved
/// interval. These are the cascade-reject victims.
pub(super) fn overlapping_pending(
    existing: &[Booking],
    slot: &TimeRange,
    exclude: crate::model::BookingId,
) -> Vec<Booking> {
    existing
        .iter()
        .filter(|b| b.status == BookingStatus::Pending && b.id != exclude && b.slot.overlaps(slot))
        .cloned()
        .collect()
}
