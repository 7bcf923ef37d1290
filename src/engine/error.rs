use ulid::Ulid;

use crate::model::RoomId;

/// Why a booking submission was turned away.
///
/// Everything here is an expected outcome returned as a value; only
/// genuine faults (poisoned state, programming errors) may panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Malformed input, with the field-level reason. Not retryable
    /// without changing the request.
    InvalidRequest(&'static str),
    RoomNotFound(RoomId),
    /// Room exists but is pulled from inventory.
    RoomUnavailable(RoomId),
    /// More dogs than the room holds. Distinct from `DateConflict` so
    /// callers can say "pick different dates" vs "this room is too small".
    CapacityExceeded { requested: u32, capacity: u32 },
    /// The proposed range overlaps the named active reservation.
    DateConflict(Ulid),
    /// Infrastructure trouble — retry with backoff.
    StoreUnavailable(String),
}

impl AdmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::StoreUnavailable(_))
    }
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionError::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
            AdmissionError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            AdmissionError::RoomUnavailable(id) => write!(f, "room not bookable: {id}"),
            AdmissionError::CapacityExceeded { requested, capacity } => {
                write!(f, "capacity exceeded: {requested} dogs in a {capacity}-dog room")
            }
            AdmissionError::DateConflict(id) => {
                write!(f, "dates conflict with reservation: {id}")
            }
            AdmissionError::StoreUnavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for AdmissionError {}

/// Errors at the store/catalog boundary. `create` re-validates the
/// overlap invariant atomically, so `Conflict` can surface here even
/// after a clean engine pre-check (the race was lost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Conflict(Ulid),
    RoomNotFound(RoomId),
    ReservationNotFound(Ulid),
    InvalidReservation(&'static str),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            StoreError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            StoreError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            StoreError::InvalidReservation(reason) => write!(f, "invalid reservation: {reason}"),
            StoreError::Unavailable(e) => write!(f, "unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for AdmissionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(id) => AdmissionError::DateConflict(id),
            StoreError::RoomNotFound(id) => AdmissionError::RoomNotFound(id),
            StoreError::ReservationNotFound(_) => {
                AdmissionError::InvalidRequest("unknown reservation")
            }
            StoreError::InvalidReservation(reason) => AdmissionError::InvalidRequest(reason),
            StoreError::Unavailable(e) => AdmissionError::StoreUnavailable(e),
        }
    }
}
