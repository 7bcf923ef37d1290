use futures::future::join_all;
use tracing::warn;

use crate::limits::MAX_QUERY_WINDOW_DAYS;
use crate::model::*;
use crate::observability::DEGRADED_READS_TOTAL;

use super::availability;
use super::conflict::is_free;
use super::{AdmissionError, Engine};

impl Engine {
    /// Occupied dates for a room, ascending and de-duplicated. Advisory
    /// display data: a store hiccup degrades to an empty answer instead of
    /// failing the whole page.
    pub async fn unavailable_dates(&self, room_id: &RoomId, window: Option<DateRange>) -> Vec<Day> {
        match self.store().active_for_room(room_id).await {
            Ok(active) => availability::unavailable_dates(&active, window.as_ref()),
            Err(e) => {
                metrics::counter!(DEGRADED_READS_TOTAL).increment(1);
                warn!("unavailable-dates read degraded for room {room_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Inclusive display pairs, one per active reservation, ascending by
    /// start. Degrades like `unavailable_dates`.
    pub async fn unavailable_ranges(&self, room_id: &RoomId) -> Vec<UnavailableRange> {
        match self.store().active_for_room(room_id).await {
            Ok(active) => availability::unavailable_ranges(&active),
            Err(e) => {
                metrics::counter!(DEGRADED_READS_TOTAL).increment(1);
                warn!("unavailable-ranges read degraded for room {room_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Every reservation the identity ever created, newest first.
    /// Reservation ids are time-ordered at creation, so they double as the
    /// sort key.
    pub async fn booking_history(&self, requester: &str) -> Result<Vec<Reservation>, AdmissionError> {
        let mut all = self.store().for_requester(requester).await?;
        all.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(all)
    }

    /// Every reservation recorded for a room, any status — the admin
    /// dashboard view.
    pub async fn room_bookings(&self, room_id: &RoomId) -> Result<Vec<Reservation>, AdmissionError> {
        Ok(self.store().all_for_room(room_id).await?)
    }

    /// Bookable rooms with no active conflict anywhere in `range` — the
    /// search-results filter.
    pub async fn rooms_free_for_range(
        &self,
        range: &DateRange,
    ) -> Result<Vec<Room>, AdmissionError> {
        if range.start >= range.end {
            return Err(AdmissionError::InvalidRequest("check-out must be after check-in"));
        }
        if range.nights() > MAX_QUERY_WINDOW_DAYS {
            return Err(AdmissionError::InvalidRequest("query window too wide"));
        }

        let rooms = self.catalog().list_rooms().await?;
        let bookable: Vec<Room> = rooms.into_iter().filter(|r| r.bookable).collect();

        let reads = bookable
            .iter()
            .map(|room| self.store().active_for_room(&room.id));
        let results = join_all(reads).await;

        let mut free = Vec::new();
        for (room, active) in bookable.iter().zip(results) {
            if is_free(&active?, range) {
                free.push(room.clone());
            }
        }
        Ok(free)
    }
}
