use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::config::StoreConfig;
use crate::ledger::Ledger;
use crate::limits::MAX_RESERVATIONS_PER_ROOM;
use crate::model::*;

use super::error::StoreError;

/// Read/append abstraction over persisted bookings.
///
/// `create` is the authoritative conflict gate: the overlap check and the
/// insert are one atomic unit. Engine-level pre-checks are advisory only.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reservations whose status still constrains bookings (`Confirmed`
    /// or `CheckedIn`), reflecting every commit before the call started.
    async fn active_for_room(&self, room_id: &RoomId) -> Result<Vec<Reservation>, StoreError>;

    /// Every reservation ever recorded for the room, any status.
    async fn all_for_room(&self, room_id: &RoomId) -> Result<Vec<Reservation>, StoreError>;

    /// Every reservation created by the identity, across rooms and statuses.
    async fn for_requester(&self, requester: &str) -> Result<Vec<Reservation>, StoreError>;

    /// Persist a new reservation only if no active reservation for the
    /// same room overlaps its range, evaluated atomically with the insert.
    async fn create(&self, req: CreateReservation) -> Result<Reservation, StoreError>;
}

pub type SharedRoomSlot = Arc<RwLock<RoomSlot>>;

/// All reservation records of one room, sorted by `range.start`.
#[derive(Debug, Default)]
pub struct RoomSlot {
    reservations: Vec<Reservation>,
}

impl RoomSlot {
    /// Insert maintaining sort order by range.start.
    fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.range.start, |r| r.range.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    fn set_status(&mut self, id: Ulid, status: ReservationStatus) -> bool {
        if let Some(r) = self.reservations.iter_mut().find(|r| r.id == id) {
            r.status = status;
            true
        } else {
            false
        }
    }

    fn find(&self, id: Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    fn len(&self) -> usize {
        self.reservations.len()
    }

    /// First active reservation overlapping `range`. Binary search skips
    /// everything starting at or after `range.end` — it can't overlap.
    fn conflicting(&self, range: &DateRange) -> Option<Ulid> {
        let right = self
            .reservations
            .partition_point(|r| r.range.start < range.end);
        self.reservations[..right]
            .iter()
            .find(|r| r.status.is_active() && r.range.end > range.start)
            .map(|r| r.id)
    }

    pub fn active(&self) -> Vec<Reservation> {
        self.reservations
            .iter()
            .filter(|r| r.status.is_active())
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Reservation> {
        self.reservations.clone()
    }
}

/// Secondary lookups kept in step with the slots.
#[derive(Default)]
struct StoreIndex {
    /// reservation id → room id
    rooms_by_reservation: DashMap<Ulid, RoomId>,
    /// idempotency key → reservation id
    reservations_by_key: DashMap<String, Ulid>,
}

/// Apply a ledger event to a room slot (no locking — the caller holds the
/// slot's write guard) and keep the secondary indexes in step.
fn apply_to_slot(slot: &mut RoomSlot, event: &Event, index: &StoreIndex) {
    match event {
        Event::ReservationCreated {
            id,
            room_id,
            range,
            dog_count,
            requester,
            idempotency_key,
        } => {
            slot.insert(Reservation {
                id: *id,
                room_id: room_id.clone(),
                range: *range,
                dog_count: *dog_count,
                requester: requester.clone(),
                status: ReservationStatus::Confirmed,
            });
            index.rooms_by_reservation.insert(*id, room_id.clone());
            if let Some(key) = idempotency_key {
                index.reservations_by_key.insert(key.clone(), *id);
            }
        }
        Event::StatusChanged { id, status, .. } => {
            slot.set_status(*id, *status);
        }
    }
}

fn event_room_id(event: &Event) -> &RoomId {
    match event {
        Event::ReservationCreated { room_id, .. } | Event::StatusChanged { room_id, .. } => room_id,
    }
}

// ── Group-commit ledger channel ──────────────────────────

pub(crate) enum LedgerCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the ledger and batches appends for group
/// commit:
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush+fsync for the whole batch.
/// 5. Respond to all senders.
async fn ledger_writer_loop(mut ledger: Ledger, mut rx: mpsc::Receiver<LedgerCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            LedgerCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(LedgerCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush the batch first, then the non-append command
                            flush_and_respond(&mut ledger, &mut batch);
                            handle_non_append(&mut ledger, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut ledger, &mut batch);
                }
            }
            other => handle_non_append(&mut ledger, other),
        }
    }
}

fn flush_and_respond(
    ledger: &mut Ledger,
    batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>,
) {
    metrics::histogram!(crate::observability::LEDGER_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(ledger, batch);
    metrics::histogram!(crate::observability::LEDGER_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    ledger: &mut Ledger,
    batch: &[(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = ledger.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (these callers were told it failed).
    let flush_err = ledger.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(ledger: &mut Ledger, cmd: LedgerCommand) {
    match cmd {
        LedgerCommand::Compact { events, response } => {
            let result = Ledger::write_compact_file(ledger.path(), &events)
                .and_then(|()| ledger.swap_compact_file());
            let _ = response.send(result);
        }
        LedgerCommand::AppendsSinceCompact { response } => {
            let _ = response.send(ledger.appends_since_compact());
        }
        LedgerCommand::Append { .. } => unreachable!(),
    }
}

// ── MemoryStore ──────────────────────────────────────────

/// Document-store-shaped reservation store, keyed by room, with a durable
/// ledger behind it.
///
/// Each room's records live behind one `RwLock`. `create` holds the write
/// guard across conflict re-check, ledger append, and apply — the mutual
/// exclusion that keeps two racing admissions for the same room from both
/// committing overlapping ranges.
pub struct MemoryStore {
    slots: DashMap<RoomId, SharedRoomSlot>,
    index: StoreIndex,
    ledger_tx: mpsc::Sender<LedgerCommand>,
    op_timeout: Duration,
    compact_threshold: u64,
}

impl MemoryStore {
    /// Replay the ledger at `cfg.ledger_path` and start the group-commit
    /// writer task. Must run inside a tokio runtime.
    pub fn open(cfg: &StoreConfig) -> io::Result<Self> {
        let events = Ledger::replay(&cfg.ledger_path)?;
        let ledger = Ledger::open(&cfg.ledger_path)?;
        let (ledger_tx, ledger_rx) = mpsc::channel(4096);
        tokio::spawn(ledger_writer_loop(ledger, ledger_rx));

        let store = Self {
            slots: DashMap::new(),
            index: StoreIndex::default(),
            ledger_tx,
            op_timeout: cfg.op_timeout,
            compact_threshold: cfg.compact_threshold,
        };

        // Replay — the store is the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention).
        for event in &events {
            let slot = store.slot(event_room_id(event));
            let mut guard = slot.try_write().expect("replay: uncontended write");
            apply_to_slot(&mut guard, event, &store.index);
        }

        Ok(store)
    }

    /// Room slot, created on demand — rooms themselves are a catalog
    /// concern, the store only files reservations under their key.
    fn slot(&self, room_id: &RoomId) -> SharedRoomSlot {
        self.slots
            .entry(room_id.clone())
            .or_default()
            .value()
            .clone()
    }

    fn existing_slot(&self, room_id: &RoomId) -> Option<SharedRoomSlot> {
        self.slots.get(room_id).map(|e| e.value().clone())
    }

    /// Write an event through the background group-commit writer.
    async fn ledger_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.ledger_tx
            .send(LedgerCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Unavailable("ledger writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("ledger writer dropped response".into()))?
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    pub async fn find(&self, id: Ulid) -> Option<Reservation> {
        let room_id = self
            .index
            .rooms_by_reservation
            .get(&id)
            .map(|e| e.value().clone())?;
        let slot = self.existing_slot(&room_id)?;
        let guard = slot.read().await;
        guard.find(id).cloned()
    }

    /// Status write-through for the external front-desk and cancellation
    /// workflows. Cancellation removes the reservation from the active
    /// set, freeing its range for new bookings.
    pub async fn set_status(&self, id: Ulid, status: ReservationStatus) -> Result<(), StoreError> {
        let room_id = self
            .index
            .rooms_by_reservation
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::ReservationNotFound(id))?;
        let slot = self
            .existing_slot(&room_id)
            .ok_or(StoreError::ReservationNotFound(id))?;

        let mut guard = self.lock_slot(&slot).await?;
        if guard.find(id).is_none() {
            return Err(StoreError::ReservationNotFound(id));
        }
        let event = Event::StatusChanged {
            id,
            room_id: room_id.clone(),
            status,
        };
        self.ledger_append(&event).await?;
        apply_to_slot(&mut guard, &event, &self.index);
        Ok(())
    }

    /// Acquire a slot's write guard within the configured bound. Lock
    /// contention is the only unbounded wait in the store; the ledger
    /// append behind it is a local group-committed fsync.
    async fn lock_slot<'a>(
        &self,
        slot: &'a SharedRoomSlot,
    ) -> Result<tokio::sync::RwLockWriteGuard<'a, RoomSlot>, StoreError> {
        tokio::time::timeout(self.op_timeout, slot.write())
            .await
            .map_err(|_| StoreError::Unavailable("store operation timed out".into()))
    }

    /// Rewrite the ledger with only the events needed to recreate current
    /// state, dropping churn from cancelled and checked-out stays.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let keys_by_reservation: HashMap<Ulid, String> = self
            .index
            .reservations_by_key
            .iter()
            .map(|e| (*e.value(), e.key().clone()))
            .collect();

        let slots: Vec<SharedRoomSlot> = self.slots.iter().map(|e| e.value().clone()).collect();
        let mut events = Vec::new();
        for slot in slots {
            let guard = slot.read().await;
            for r in &guard.reservations {
                events.push(Event::ReservationCreated {
                    id: r.id,
                    room_id: r.room_id.clone(),
                    range: r.range,
                    dog_count: r.dog_count,
                    requester: r.requester.clone(),
                    idempotency_key: keys_by_reservation.get(&r.id).cloned(),
                });
                if r.status != ReservationStatus::Confirmed {
                    events.push(Event::StatusChanged {
                        id: r.id,
                        room_id: r.room_id.clone(),
                        status: r.status,
                    });
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        self.ledger_tx
            .send(LedgerCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Unavailable("ledger writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("ledger writer dropped response".into()))?
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .ledger_tx
            .send(LedgerCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Compact once the append count passes the configured threshold.
    pub async fn maybe_compact(&self) -> Result<bool, StoreError> {
        if self.appends_since_compact().await >= self.compact_threshold {
            self.compact().await?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn active_for_room(&self, room_id: &RoomId) -> Result<Vec<Reservation>, StoreError> {
        match self.existing_slot(room_id) {
            Some(slot) => Ok(slot.read().await.active()),
            None => Ok(Vec::new()),
        }
    }

    async fn all_for_room(&self, room_id: &RoomId) -> Result<Vec<Reservation>, StoreError> {
        match self.existing_slot(room_id) {
            Some(slot) => Ok(slot.read().await.all()),
            None => Ok(Vec::new()),
        }
    }

    async fn for_requester(&self, requester: &str) -> Result<Vec<Reservation>, StoreError> {
        let slots: Vec<SharedRoomSlot> = self.slots.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for slot in slots {
            let guard = slot.read().await;
            out.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.requester == requester)
                    .cloned(),
            );
        }
        Ok(out)
    }

    async fn create(&self, req: CreateReservation) -> Result<Reservation, StoreError> {
        // The store re-validates its own invariants; the engine's earlier
        // checks are not trusted across the boundary.
        if req.range.start >= req.range.end {
            return Err(StoreError::InvalidReservation("check-out must be after check-in"));
        }
        if req.dog_count == 0 {
            return Err(StoreError::InvalidReservation("dog count must be positive"));
        }

        // Retry dedup: a key already committed replays the original
        // reservation instead of inserting a double booking.
        if let Some(key) = &req.idempotency_key {
            let existing = self.index.reservations_by_key.get(key).map(|e| *e.value());
            if let Some(id) = existing {
                if let Some(original) = self.find(id).await {
                    return Ok(original);
                }
            }
        }

        let slot = self.slot(&req.room_id);
        // Everything from re-check to apply happens under the room's write
        // guard; a racing create serializes here and its own re-check sees
        // this insert.
        let mut guard = self.lock_slot(&slot).await?;
        if guard.len() >= MAX_RESERVATIONS_PER_ROOM {
            return Err(StoreError::InvalidReservation("too many reservations for room"));
        }
        if let Some(conflicting) = guard.conflicting(&req.range) {
            return Err(StoreError::Conflict(conflicting));
        }

        let reservation = Reservation {
            id: Ulid::new(),
            room_id: req.room_id.clone(),
            range: req.range,
            dog_count: req.dog_count,
            requester: req.requester.clone(),
            status: ReservationStatus::Confirmed,
        };
        let event = Event::ReservationCreated {
            id: reservation.id,
            room_id: reservation.room_id.clone(),
            range: reservation.range,
            dog_count: reservation.dog_count,
            requester: reservation.requester.clone(),
            idempotency_key: req.idempotency_key,
        };
        self.ledger_append(&event).await?;
        apply_to_slot(&mut guard, &event, &self.index);
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> Day {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reservation(start: Day, end: Day, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Ulid::new(),
            room_id: RoomId::from("room-1"),
            range: DateRange::new(start, end),
            dog_count: 1,
            requester: "guest@example.com".into(),
            status,
        }
    }

    #[test]
    fn slot_insert_keeps_start_order() {
        let mut slot = RoomSlot::default();
        slot.insert(reservation(day(2025, 7, 20), day(2025, 7, 22), ReservationStatus::Confirmed));
        slot.insert(reservation(day(2025, 7, 10), day(2025, 7, 13), ReservationStatus::Confirmed));
        slot.insert(reservation(day(2025, 7, 15), day(2025, 7, 18), ReservationStatus::Confirmed));
        let starts: Vec<Day> = slot.reservations.iter().map(|r| r.range.start).collect();
        assert_eq!(starts, vec![day(2025, 7, 10), day(2025, 7, 15), day(2025, 7, 20)]);
    }

    #[test]
    fn slot_conflict_respects_boundaries() {
        let mut slot = RoomSlot::default();
        let r = reservation(day(2025, 7, 10), day(2025, 7, 13), ReservationStatus::Confirmed);
        let id = r.id;
        slot.insert(r);

        // touching before and after: free
        assert!(slot.conflicting(&DateRange::new(day(2025, 7, 7), day(2025, 7, 10))).is_none());
        assert!(slot.conflicting(&DateRange::new(day(2025, 7, 13), day(2025, 7, 16))).is_none());
        // overlapping the start
        assert_eq!(
            slot.conflicting(&DateRange::new(day(2025, 7, 9), day(2025, 7, 11))),
            Some(id)
        );
        // fully contained
        assert_eq!(
            slot.conflicting(&DateRange::new(day(2025, 7, 11), day(2025, 7, 12))),
            Some(id)
        );
    }

    #[test]
    fn slot_conflict_skips_inactive() {
        let mut slot = RoomSlot::default();
        slot.insert(reservation(day(2025, 7, 10), day(2025, 7, 13), ReservationStatus::Cancelled));
        assert!(slot.conflicting(&DateRange::new(day(2025, 7, 10), day(2025, 7, 13))).is_none());
    }

    #[test]
    fn slot_status_transition() {
        let mut slot = RoomSlot::default();
        let r = reservation(day(2025, 7, 10), day(2025, 7, 13), ReservationStatus::Confirmed);
        let id = r.id;
        slot.insert(r);

        assert!(slot.set_status(id, ReservationStatus::CheckedIn));
        assert_eq!(slot.active().len(), 1);
        assert!(slot.set_status(id, ReservationStatus::CheckedOut));
        assert!(slot.active().is_empty());
        assert_eq!(slot.all().len(), 1);
        assert!(!slot.set_status(Ulid::new(), ReservationStatus::Cancelled));
    }
}
