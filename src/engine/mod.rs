mod admission;
mod availability;
mod conflict;
mod error;
mod queries;
mod store;

pub use availability::{occupied_on, unavailable_dates, unavailable_ranges};
pub use conflict::{first_conflict, is_free};
pub use error::{AdmissionError, StoreError};
pub use store::{MemoryStore, ReservationStore, RoomSlot, SharedRoomSlot};

pub(crate) use conflict::today;

use std::sync::Arc;

use crate::catalog::RoomCatalog;
use crate::model::{Room, RoomId};
use crate::notify::NotifyHub;

/// The booking admission service.
///
/// Orchestrates validation, room lookup, the optimistic conflict
/// pre-check, and the store's atomic admit; emits facts for external
/// notification consumers. Stateless apart from its collaborators, so one
/// instance can serve arbitrarily many concurrent requests.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    catalog: Arc<dyn RoomCatalog>,
    notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        catalog: Arc<dyn RoomCatalog>,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self {
            store,
            catalog,
            notify,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<dyn RoomCatalog> {
        &self.catalog
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    pub(crate) async fn load_room(&self, room_id: &RoomId) -> Result<Room, AdmissionError> {
        match self.catalog.get_room(room_id).await {
            Ok(Some(room)) => Ok(room),
            Ok(None) => Err(AdmissionError::RoomNotFound(room_id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
