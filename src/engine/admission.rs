use tracing::{debug, info};

use crate::model::*;
use crate::observability::{
    ADMISSION_DURATION_SECONDS, BOOKINGS_ADMITTED_TOTAL, BOOKINGS_REJECTED_TOTAL, rejection_label,
};

use super::conflict::{first_conflict, today, validate_request};
use super::{AdmissionError, Engine};

impl Engine {
    /// Submit a booking. One attempt walks
    /// Received → Validated → Checked → Admitted | Rejected; every
    /// rejection is a typed value, never a panic across this boundary.
    pub async fn create_booking(&self, req: CreateReservation) -> Result<Reservation, AdmissionError> {
        let started = std::time::Instant::now();
        let result = self.admit(req, today()).await;
        metrics::histogram!(ADMISSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                metrics::counter!(BOOKINGS_ADMITTED_TOTAL).increment(1);
                info!("admitted reservation {} for room {}", r.id, r.room_id);
            }
            Err(e) => {
                metrics::counter!(BOOKINGS_REJECTED_TOTAL, "reason" => rejection_label(e))
                    .increment(1);
                debug!("booking rejected: {e}");
            }
        }
        result
    }

    pub(crate) async fn admit(
        &self,
        req: CreateReservation,
        today: Day,
    ) -> Result<Reservation, AdmissionError> {
        // 1. Validate — local, no I/O.
        validate_request(&req, today)?;

        // 2. Load the room and check its static attributes.
        let room = self.load_room(&req.room_id).await?;
        if !room.bookable {
            return Err(AdmissionError::RoomUnavailable(req.room_id.clone()));
        }
        if req.dog_count > room.capacity {
            return Err(AdmissionError::CapacityExceeded {
                requested: req.dog_count,
                capacity: room.capacity,
            });
        }

        // 3. Optimistic pre-check: spares the caller a wasted store round
        //    trip. The store re-checks under the room lock regardless.
        //    Keyed retries skip it — their own original reservation would
        //    read as a conflict before the store's dedup could replay it.
        if req.idempotency_key.is_none() {
            let active = self.store().active_for_room(&req.room_id).await?;
            if let Some(conflicting) = first_conflict(&active, &req.range) {
                return Err(AdmissionError::DateConflict(conflicting.id));
            }
        }

        // 4. Atomic admit. A Conflict here means the race was lost after
        //    the pre-check passed.
        let reservation = self.store().create(req).await?;

        // 5. Emit the fact. Best-effort: delivery trouble never unwinds an
        //    admitted reservation.
        self.notify().publish(&Fact::BookingCreated {
            reservation_id: reservation.id,
            room_id: reservation.room_id.clone(),
            range: reservation.range,
            dog_count: reservation.dog_count,
            requester: reservation.requester.clone(),
        });

        Ok(reservation)
    }
}
