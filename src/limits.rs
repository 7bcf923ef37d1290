use std::time::Duration;

/// Longest bookable stay in nights.
pub const MAX_STAY_NIGHTS: i64 = 90;

/// Furthest a check-in may lie in the future, in days.
pub const MAX_ADVANCE_DAYS: i64 = 730;

/// Widest availability query window, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 366;

/// Reservation records (any status) a single room slot may hold.
pub const MAX_RESERVATIONS_PER_ROOM: usize = 10_000;

/// Requester identities are opaque but bounded (email-sized).
pub const MAX_REQUESTER_LEN: usize = 320;

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

pub const MAX_DOGS_PER_BOOKING: u32 = 16;

/// Store operations never hang: past this, callers see a retryable
/// unavailability error instead.
pub const DEFAULT_STORE_OP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Ledger appends since the last compaction that trigger the next one.
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
