//! End-to-end booking flows through the public API: admission, facts,
//! availability reads, the daily sweep, and ledger durability.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;

use kennel::catalog::MemoryCatalog;
use kennel::config::StoreConfig;
use kennel::engine::{AdmissionError, Engine, MemoryStore, ReservationStore};
use kennel::model::*;
use kennel::notify::NotifyHub;
use kennel::sweep;

fn test_ledger_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("kennel_test_flow");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn today() -> Day {
    chrono::Local::now().date_naive()
}

fn room(id: &str, capacity: u32) -> Room {
    Room {
        id: RoomId::from(id),
        capacity,
        bookable: true,
    }
}

fn request(room: &str, start: Day, end: Day, dogs: u32) -> CreateReservation {
    CreateReservation {
        room_id: RoomId::from(room),
        range: DateRange::new(start, end),
        dog_count: dogs,
        requester: "flow@example.com".into(),
        idempotency_key: None,
    }
}

fn build(ledger: &str, rooms: Vec<Room>) -> (Arc<Engine>, Arc<MemoryStore>, Arc<NotifyHub>) {
    let store = Arc::new(MemoryStore::open(&StoreConfig::new(test_ledger_path(ledger))).unwrap());
    let catalog = Arc::new(MemoryCatalog::new());
    for r in rooms {
        catalog.upsert_room(r);
    }
    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(store.clone(), catalog, notify.clone()));
    (engine, store, notify)
}

#[tokio::test]
async fn booking_appears_in_every_read_path() {
    let (engine, _store, notify) = build("read_paths.ledger", vec![room("suite-1", 2)]);
    let rid = RoomId::from("suite-1");
    let mut facts = notify.subscribe_all();

    let start = today() + Duration::days(7);
    let end = start + Duration::days(3);
    let admitted = engine.create_booking(request("suite-1", start, end, 2)).await.unwrap();

    // fact reached the external sink
    match facts.recv().await.unwrap() {
        Fact::BookingCreated { reservation_id, .. } => assert_eq!(reservation_id, admitted.id),
        other => panic!("unexpected fact: {other:?}"),
    }

    // every occupied night is unavailable, boundaries excluded
    let dates = engine.unavailable_dates(&rid, None).await;
    assert_eq!(dates.len(), 3);
    assert_eq!(dates.first(), Some(&start));
    assert!(!dates.contains(&end));

    // display pair is inclusive
    let ranges = engine.unavailable_ranges(&rid).await;
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].start, start);
    assert_eq!(ranges[0].end, end - Duration::days(1));

    // history sees it
    let history = engine.booking_history("flow@example.com").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, admitted.id);
}

#[tokio::test]
async fn yesterday_checkin_is_rejected_as_invalid() {
    let (engine, _store, _notify) = build("yesterday.ledger", vec![room("suite-1", 2)]);

    let start = today() - Duration::days(1);
    let err = engine
        .create_booking(request("suite-1", start, start + Duration::days(2), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidRequest(_)));
    assert!(!err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn race_for_one_room_admits_exactly_one() {
    let (engine, store, _notify) = build("flow_race.ledger", vec![room("suite-1", 2)]);

    let start = today() + Duration::days(14);
    let end = start + Duration::days(2);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.create_booking(request("suite-1", start, end, 1)).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AdmissionError::DateConflict(_)) => {}
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(
        store.active_for_room(&RoomId::from("suite-1")).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn sweep_sees_todays_occupancy() {
    let (engine, _store, notify) = build(
        "flow_sweep.ledger",
        vec![room("suite-1", 2), room("suite-2", 2)],
    );

    // suite-1 occupied from today; suite-2 stays free
    engine
        .create_booking(request("suite-1", today(), today() + Duration::days(2), 1))
        .await
        .unwrap();

    let mut facts = notify.subscribe_all();
    let free = sweep::rooms_free_on(&engine, today()).await.unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].id, RoomId::from("suite-2"));

    let count = sweep::run_sweep_once(&engine, today()).await.unwrap();
    assert_eq!(count, 1);
    match facts.recv().await.unwrap() {
        Fact::RoomFreeToday { room_id, date } => {
            assert_eq!(room_id, RoomId::from("suite-2"));
            assert_eq!(date, today());
        }
        other => panic!("unexpected fact: {other:?}"),
    }
}

#[tokio::test]
async fn ledger_survives_a_restart() {
    let path = test_ledger_path("flow_restart.ledger");
    let start = today() + Duration::days(30);
    let end = start + Duration::days(2);

    {
        let store = Arc::new(MemoryStore::open(&StoreConfig::new(path.clone())).unwrap());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.upsert_room(room("suite-1", 2));
        let engine = Engine::new(store, catalog, Arc::new(NotifyHub::new()));
        engine.create_booking(request("suite-1", start, end, 1)).await.unwrap();
    }

    // a fresh process replays the ledger and still refuses the overlap
    let store = Arc::new(MemoryStore::open(&StoreConfig::new(path)).unwrap());
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.upsert_room(room("suite-1", 2));
    let engine = Engine::new(store, catalog, Arc::new(NotifyHub::new()));

    let err = engine
        .create_booking(request("suite-1", start, end, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::DateConflict(_)));
}
