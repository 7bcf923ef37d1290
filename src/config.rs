use std::path::PathBuf;
use std::time::Duration;

use crate::limits::{DEFAULT_COMPACT_THRESHOLD, DEFAULT_STORE_OP_TIMEOUT, DEFAULT_SWEEP_INTERVAL};

/// Store wiring. Injected into [`crate::engine::MemoryStore::open`] —
/// nothing in the crate reads the environment behind the caller's back.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the reservation ledger file.
    pub ledger_path: PathBuf,
    /// Bound on any single store operation.
    pub op_timeout: Duration,
    /// Appends since the last compaction before the store suggests another.
    pub compact_threshold: u64,
}

impl StoreConfig {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            op_timeout: DEFAULT_STORE_OP_TIMEOUT,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }

    /// Read `KENNEL_DATA_DIR`, `KENNEL_STORE_TIMEOUT_SECS` and
    /// `KENNEL_COMPACT_THRESHOLD`, falling back to defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("KENNEL_DATA_DIR").unwrap_or_else(|_| "./data".into());
        let mut cfg = Self::new(PathBuf::from(data_dir).join("reservations.ledger"));
        if let Some(secs) = std::env::var("KENNEL_STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.op_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = std::env::var("KENNEL_COMPACT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.compact_threshold = n;
        }
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Cadence of the free-rooms sweep.
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SweepConfig {
    /// Read `KENNEL_SWEEP_INTERVAL_SECS`, falling back to daily.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = std::env::var("KENNEL_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.interval = Duration::from_secs(secs);
        }
        cfg
    }
}
