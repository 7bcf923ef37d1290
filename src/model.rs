use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar date — the only time type. A stay occupies the nights of
/// `[check-in, check-out)`; checkout day is free for the next guest.
pub type Day = NaiveDate;

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Day,
    pub end: Day,
}

impl DateRange {
    pub fn new(start: Day, end: Day) -> Self {
        debug_assert!(start < end, "DateRange start must be before end");
        Self { start, end }
    }

    /// Number of occupied nights.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_day(&self, day: Day) -> bool {
        self.start <= day && day < self.end
    }

    /// Every occupied date in `[start, end)`, ascending. Restartable —
    /// each call yields a fresh iterator.
    pub fn days(self) -> impl Iterator<Item = Day> {
        self.start.iter_days().take_while(move |d| *d < self.end)
    }

    /// Last occupied night — the exclusive end pulled back one day.
    /// This is the inclusive boundary calendars display.
    pub fn display_end(&self) -> Day {
        self.end.pred_opt().unwrap_or(self.end)
    }
}

/// Opaque room identifier, owned by the external room catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room attributes the booking core reads. Everything else about a room
/// (title, price, images) lives in the catalog and never enters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Max dogs the room holds.
    pub capacity: u32,
    /// Rooms pulled from inventory stop accepting new bookings; existing
    /// reservations are untouched.
    pub bookable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl ReservationStatus {
    /// Only active reservations constrain future bookings.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Confirmed | Self::CheckedIn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub room_id: RoomId,
    pub range: DateRange,
    pub dog_count: u32,
    /// Pre-authenticated identity of whoever booked. The core never
    /// derives this itself.
    pub requester: String,
    pub status: ReservationStatus,
}

/// A booking submission, before the store has admitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservation {
    pub room_id: RoomId,
    pub range: DateRange,
    pub dog_count: u32,
    pub requester: String,
    /// Caller-supplied retry dedup key. A key the store has already seen
    /// replays the original reservation instead of double-booking.
    pub idempotency_key: Option<String>,
}

/// The event types — flat, no nesting. This is the ledger record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        id: Ulid,
        room_id: RoomId,
        range: DateRange,
        dog_count: u32,
        requester: String,
        idempotency_key: Option<String>,
    },
    /// Front-desk and cancellation workflows write status transitions
    /// through the store; the admission path never emits this.
    StatusChanged {
        id: Ulid,
        room_id: RoomId,
        status: ReservationStatus,
    },
}

/// Facts published to external notification consumers. Delivery is
/// best-effort and never part of the admission invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fact {
    BookingCreated {
        reservation_id: Ulid,
        room_id: RoomId,
        range: DateRange,
        dog_count: u32,
        requester: String,
    },
    RoomFreeToday {
        room_id: RoomId,
        date: Day,
    },
}

impl Fact {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Fact::BookingCreated { room_id, .. } | Fact::RoomFreeToday { room_id, .. } => room_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Inclusive first/last occupied night, as calendars display it. The
/// exclusive checkout day is already pulled back one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableRange {
    pub start: Day,
    pub end: Day,
}
