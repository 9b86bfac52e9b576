//! Booking engine.
//!
//! A request is validated against the hall grid and for repeats before the
//! store is touched. The seat-conflict decision is left to the store's
//! `(performance, row, seat)` uniqueness constraint at commit time: no
//! availability pre-check is made, since one would race with concurrent
//! bookings. A request is committed whole or not at all.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::geometry::{HallGeometry, RequestedSeat, SeatCoord};
use crate::models::{PerformanceDetails, Reservation};
use crate::store::{ReservationStore, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("the list of seats is empty")]
    EmptyRequest,

    #[error("seat outside the hall: row={row}, seat={seat}")]
    OutOfRange { row: i64, seat: i64 },

    #[error("seat repeated in the request: row={row}, seat={seat}")]
    DuplicateInRequest { row: i32, seat: i32 },

    #[error("some seats are already taken, refresh the seat map and try again")]
    SeatsAlreadyTaken,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatTaken(_) => BookingError::SeatsAlreadyTaken,
            other => BookingError::Store(other),
        }
    }
}

/// Checks a seat request against the hall grid and returns the coordinates in
/// request order. Range and repeat checks run in one pass in request order;
/// the first offending seat decides the error.
pub fn validate_request<S>(
    geometry: HallGeometry,
    seats: &[S],
) -> Result<Vec<SeatCoord>, BookingError>
where
    S: Into<RequestedSeat> + Copy,
{
    if seats.is_empty() {
        return Err(BookingError::EmptyRequest);
    }
    let mut seen = HashSet::with_capacity(seats.len());
    let mut coords = Vec::with_capacity(seats.len());
    for &seat in seats {
        let requested: RequestedSeat = seat.into();
        let coord = geometry.locate(requested).ok_or(BookingError::OutOfRange {
            row: requested.row,
            seat: requested.seat,
        })?;
        if !seen.insert(coord) {
            return Err(BookingError::DuplicateInRequest {
                row: coord.row,
                seat: coord.seat,
            });
        }
        coords.push(coord);
    }
    Ok(coords)
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_reservation<S>(
        &self,
        user_id: i64,
        performance: &PerformanceDetails,
        seats: &[S],
    ) -> Result<Reservation, BookingError>
    where
        S: Into<RequestedSeat> + Copy,
    {
        let seats = validate_request(performance.theatre_hall.geometry(), seats)?;

        match self.store.commit_reservation(user_id, performance.id, &seats).await {
            Ok(reservation) => {
                info!(
                    reservation_id = reservation.id,
                    user_id,
                    performance_id = performance.id,
                    seats = reservation.tickets.len(),
                    "Reservation committed"
                );
                Ok(reservation)
            }
            Err(StoreError::SeatTaken(coord)) => {
                warn!(
                    user_id,
                    performance_id = performance.id,
                    row = coord.row,
                    seat = coord.seat,
                    "Seat already taken, reservation rolled back"
                );
                Err(BookingError::SeatsAlreadyTaken)
            }
            Err(e) => {
                error!(
                    user_id,
                    performance_id = performance.id,
                    "Reservation commit failed: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Deletes the user's reservation with all its tickets; the seats are free
    /// as soon as this returns.
    pub async fn cancel_reservation(
        &self,
        user_id: i64,
        reservation_id: i64,
    ) -> Result<(), StoreError> {
        if !self.store.delete_reservation(user_id, reservation_id).await? {
            return Err(StoreError::NotFound {
                entity: "reservation",
                id: reservation_id,
            });
        }
        info!(reservation_id, user_id, "Reservation cancelled");
        Ok(())
    }
}
