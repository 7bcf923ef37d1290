use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Fact, RoomId};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for booking facts.
///
/// Subscribers pick a single room or the firehose. Publishing is
/// fire-and-forget: a lagging or absent receiver never fails the
/// operation that produced the fact.
pub struct NotifyHub {
    rooms: DashMap<RoomId, broadcast::Sender<Fact>>,
    firehose: broadcast::Sender<Fact>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            firehose: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Subscribe to facts about one room. Creates the channel if needed.
    pub fn subscribe_room(&self, room_id: &RoomId) -> broadcast::Receiver<Fact> {
        let sender = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Subscribe to every fact the core emits.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Fact> {
        self.firehose.subscribe()
    }

    /// Publish a fact. No-op if nobody is listening.
    pub fn publish(&self, fact: &Fact) {
        if let Some(sender) = self.rooms.get(fact.room_id()) {
            let _ = sender.send(fact.clone());
        }
        let _ = self.firehose.send(fact.clone());
    }

    /// Remove a room channel (e.g. when a room leaves the catalog).
    pub fn remove(&self, room_id: &RoomId) {
        self.rooms.remove(room_id);
    }
}
