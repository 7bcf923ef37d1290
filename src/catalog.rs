use async_trait::async_trait;
use dashmap::DashMap;

use crate::engine::StoreError;
use crate::model::{Room, RoomId};

/// The external room catalog, as the booking core sees it. The catalog
/// owns every other room attribute (title, price, images, reviews); only
/// capacity and bookability cross this seam.
#[async_trait]
pub trait RoomCatalog: Send + Sync {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;
}

/// In-process catalog backing. Administrators manage inventory through
/// the upsert/bookability methods; the engine only ever reads.
pub struct MemoryCatalog {
    rooms: DashMap<RoomId, Room>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn upsert_room(&self, room: Room) {
        self.rooms.insert(room.id.clone(), room);
    }

    /// Flip a room in or out of inventory. Returns false if unknown.
    pub fn set_bookable(&self, room_id: &RoomId, bookable: bool) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(mut entry) => {
                entry.bookable = bookable;
                true
            }
            None => false,
        }
    }

    pub fn remove_room(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.remove(room_id).map(|(_, room)| room)
    }
}

#[async_trait]
impl RoomCatalog for MemoryCatalog {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(room_id).map(|e| e.value().clone()))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.iter().map(|e| e.value().clone()).collect())
    }
}
