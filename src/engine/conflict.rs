use crate::limits::*;
use crate::model::*;

use super::error::AdmissionError;

pub(crate) fn today() -> Day {
    chrono::Local::now().date_naive()
}

/// True iff no active reservation overlaps the proposed range.
/// An empty set is always free; touching ranges don't collide.
pub fn is_free(active: &[Reservation], proposed: &DateRange) -> bool {
    first_conflict(active, proposed).is_none()
}

/// The first active reservation whose range overlaps `proposed`.
/// Non-active entries (cancelled, checked out, pending) never constrain.
pub fn first_conflict<'a>(
    active: &'a [Reservation],
    proposed: &DateRange,
) -> Option<&'a Reservation> {
    active
        .iter()
        .find(|r| r.status.is_active() && r.range.overlaps(proposed))
}

pub(crate) fn validate_range(range: &DateRange) -> Result<(), AdmissionError> {
    if range.start >= range.end {
        return Err(AdmissionError::InvalidRequest("check-out must be after check-in"));
    }
    if range.nights() > MAX_STAY_NIGHTS {
        return Err(AdmissionError::InvalidRequest("stay too long"));
    }
    Ok(())
}

/// Local validation — no I/O. Field-level failures come back as
/// `InvalidRequest`; room-dependent checks happen later in admission.
pub(crate) fn validate_request(
    req: &CreateReservation,
    today: Day,
) -> Result<(), AdmissionError> {
    validate_range(&req.range)?;
    if req.range.start < today {
        return Err(AdmissionError::InvalidRequest("check-in date cannot be in the past"));
    }
    if (req.range.start - today).num_days() > MAX_ADVANCE_DAYS {
        return Err(AdmissionError::InvalidRequest("check-in too far in the future"));
    }
    if req.dog_count == 0 {
        return Err(AdmissionError::InvalidRequest("at least one dog is required"));
    }
    if req.dog_count > MAX_DOGS_PER_BOOKING {
        return Err(AdmissionError::InvalidRequest("too many dogs for one booking"));
    }
    if req.requester.is_empty() {
        return Err(AdmissionError::InvalidRequest("requester is required"));
    }
    if req.requester.len() > MAX_REQUESTER_LEN {
        return Err(AdmissionError::InvalidRequest("requester too long"));
    }
    if let Some(key) = &req.idempotency_key
        && key.len() > MAX_IDEMPOTENCY_KEY_LEN
    {
        return Err(AdmissionError::InvalidRequest("idempotency key too long"));
    }
    Ok(())
}
