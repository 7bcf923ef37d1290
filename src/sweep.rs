use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::config::SweepConfig;
use crate::engine::{AdmissionError, Engine, occupied_on, today};
use crate::model::{Day, Fact, Room};
use crate::observability::{SWEEP_DURATION_SECONDS, SWEEP_FREE_ROOMS, SWEEP_RUNS_TOTAL};

/// Bookable rooms with no active reservation occupying `date`.
///
/// Unlike the advisory display reads, a store failure here propagates:
/// the facts this feeds are only worth emitting if the scan was complete.
pub async fn rooms_free_on(engine: &Engine, date: Day) -> Result<Vec<Room>, AdmissionError> {
    let rooms = engine.catalog().list_rooms().await?;
    let bookable: Vec<Room> = rooms.into_iter().filter(|r| r.bookable).collect();

    let reads = bookable
        .iter()
        .map(|room| engine.store().active_for_room(&room.id));
    let results = join_all(reads).await;

    let mut free = Vec::new();
    for (room, active) in bookable.iter().zip(results) {
        if !occupied_on(&active?, date) {
            free.push(room.clone());
        }
    }
    Ok(free)
}

/// One sweep pass: find the rooms free on `date` and emit one fact per
/// room for the external notifier. Pure read path — safe to repeat and to
/// run alongside live bookings; slightly stale answers are fine because
/// admission re-checks at write time.
pub async fn run_sweep_once(engine: &Engine, date: Day) -> Result<usize, AdmissionError> {
    let started = std::time::Instant::now();
    let free = rooms_free_on(engine, date).await?;

    for room in &free {
        engine.notify().publish(&Fact::RoomFreeToday {
            room_id: room.id.clone(),
            date,
        });
    }

    metrics::counter!(SWEEP_RUNS_TOTAL).increment(1);
    metrics::gauge!(SWEEP_FREE_ROOMS).set(free.len() as f64);
    metrics::histogram!(SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    Ok(free.len())
}

/// Background task that sweeps on the configured cadence, each pass
/// against that day's date.
pub async fn run_daily_sweep(engine: Arc<Engine>, cfg: SweepConfig) {
    let mut interval = tokio::time::interval(cfg.interval);
    loop {
        interval.tick().await;
        match run_sweep_once(&engine, today()).await {
            Ok(count) => info!("daily sweep: {count} rooms free today"),
            Err(e) => error!("daily sweep failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::StoreConfig;
    use crate::engine::{MemoryStore, ReservationStore};
    use crate::model::*;
    use crate::notify::NotifyHub;
    use std::path::PathBuf;

    fn test_ledger_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("kennel_test_sweep");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn day(y: i32, m: u32, d: u32) -> Day {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn room(id: &str, bookable: bool) -> Room {
        Room {
            id: RoomId::from(id),
            capacity: 2,
            bookable,
        }
    }

    #[tokio::test]
    async fn sweep_reports_unoccupied_bookable_rooms() {
        let store = Arc::new(MemoryStore::open(&StoreConfig::new(test_ledger_path("sweep_basic.ledger"))).unwrap());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.upsert_room(room("room-free", true));
        catalog.upsert_room(room("room-busy", true));
        catalog.upsert_room(room("room-pulled", false));
        let engine = Engine::new(store.clone(), catalog, Arc::new(NotifyHub::new()));

        store
            .create(CreateReservation {
                room_id: RoomId::from("room-busy"),
                range: DateRange::new(day(2025, 7, 10), day(2025, 7, 13)),
                dog_count: 1,
                requester: "guest@example.com".into(),
                idempotency_key: None,
            })
            .await
            .unwrap();

        let free = rooms_free_on(&engine, day(2025, 7, 11)).await.unwrap();
        let ids: Vec<&str> = free.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["room-free"]);

        // checkout day: the stay no longer occupies the room
        let free = rooms_free_on(&engine, day(2025, 7, 13)).await.unwrap();
        assert_eq!(free.len(), 2);
    }

    #[tokio::test]
    async fn sweep_emits_one_fact_per_free_room() {
        let store = Arc::new(MemoryStore::open(&StoreConfig::new(test_ledger_path("sweep_facts.ledger"))).unwrap());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.upsert_room(room("room-1", true));
        catalog.upsert_room(room("room-2", true));
        let notify = Arc::new(NotifyHub::new());
        let mut rx = notify.subscribe_all();
        let engine = Engine::new(store, catalog, notify);

        let date = day(2025, 7, 11);
        let count = run_sweep_once(&engine, date).await.unwrap();
        assert_eq!(count, 2);

        let mut seen = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                Fact::RoomFreeToday { room_id, date: d } => {
                    assert_eq!(d, date);
                    seen.push(room_id);
                }
                other => panic!("unexpected fact: {other:?}"),
            }
        }
        seen.sort();
        assert_eq!(seen, vec![RoomId::from("room-1"), RoomId::from("room-2")]);
    }

    #[tokio::test]
    async fn sweep_is_repeatable() {
        let store = Arc::new(MemoryStore::open(&StoreConfig::new(test_ledger_path("sweep_repeat.ledger"))).unwrap());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.upsert_room(room("room-1", true));
        let engine = Engine::new(store, catalog, Arc::new(NotifyHub::new()));

        let date = day(2025, 7, 11);
        assert_eq!(run_sweep_once(&engine, date).await.unwrap(), 1);
        assert_eq!(run_sweep_once(&engine, date).await.unwrap(), 1);
    }
}
