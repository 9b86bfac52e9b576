//! Persistence boundary for the booking core.
//!
//! Every backend must provide:
//! - atomic multi-row commits of a reservation and its tickets, rolled back as a
//!   whole when any ticket insert fails;
//! - uniqueness of `(performance, row, seat)` across all concurrent callers,
//!   checked when the ticket is inserted;
//! - cascade of tickets with their reservation, and refusal to delete a
//!   performance that has tickets or a hall/play that has performances.
//!
//! Two backends ship: [`PgStore`] for production and [`InMemoryStore`] for
//! tests and database-less local runs.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::geometry::SeatCoord;
use crate::models::{
    NewHall, NewPerformance, NewPlay, NewUser, Performance, PerformanceDetails, PerformanceFilter,
    Play, PlayChanges, Reservation, TheatreHall, Ticket, User,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A ticket insert hit the `(performance, row, seat)` uniqueness constraint.
    #[error("seat row={}, seat={} is already taken", .0.row, .0.seat)]
    SeatTaken(SeatCoord),

    /// Any other uniqueness constraint (hall name, play title, hall timeslot, username).
    #[error("{0}")]
    Duplicate(String),

    /// A check constraint rejected the row.
    #[error("{0}")]
    Invalid(String),

    #[error("{entity} {id} cannot be deleted while it has {dependents}")]
    Protected {
        entity: &'static str,
        id: i64,
        dependents: &'static str,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait HallStore: Send + Sync {
    async fn create_hall(&self, hall: NewHall) -> Result<TheatreHall, StoreError>;
    async fn get_hall(&self, id: i64) -> Result<Option<TheatreHall>, StoreError>;
    async fn find_hall_by_name(&self, name: &str) -> Result<Option<TheatreHall>, StoreError>;
    /// Ordered by name.
    async fn list_halls(&self) -> Result<Vec<TheatreHall>, StoreError>;
    /// Only the name may change; the seat grid is fixed once tickets can exist.
    async fn rename_hall(&self, id: i64, name: String) -> Result<TheatreHall, StoreError>;
    async fn delete_hall(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PlayStore: Send + Sync {
    async fn create_play(&self, play: NewPlay) -> Result<Play, StoreError>;
    async fn get_play(&self, id: i64) -> Result<Option<Play>, StoreError>;
    async fn find_play_by_title(&self, title: &str) -> Result<Option<Play>, StoreError>;
    /// Ordered by title.
    async fn list_plays(&self) -> Result<Vec<Play>, StoreError>;
    async fn update_play(&self, id: i64, changes: PlayChanges) -> Result<Play, StoreError>;
    async fn delete_play(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn create_performance(
        &self,
        performance: NewPerformance,
    ) -> Result<Performance, StoreError>;
    async fn get_performance(&self, id: i64) -> Result<Option<PerformanceDetails>, StoreError>;
    /// Ordered by show time, then id.
    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
    ) -> Result<Vec<PerformanceDetails>, StoreError>;
    async fn reschedule_performance(
        &self,
        id: i64,
        show_time: DateTime<Utc>,
    ) -> Result<Performance, StoreError>;
    async fn delete_performance(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Every (row, seat) currently ticketed for the performance, in one read.
    async fn taken_seats(&self, performance_id: i64) -> Result<HashSet<SeatCoord>, StoreError>;

    /// Creates the reservation and one ticket per seat as a single atomic unit.
    /// Fails with [`StoreError::SeatTaken`] and leaves nothing behind if any
    /// seat is already ticketed for this performance.
    async fn commit_reservation(
        &self,
        user_id: i64,
        performance_id: i64,
        seats: &[SeatCoord],
    ) -> Result<Reservation, StoreError>;

    /// Newest first, tickets attached.
    async fn list_reservations(&self, user_id: i64) -> Result<Vec<Reservation>, StoreError>;
    async fn get_reservation(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Reservation>, StoreError>;
    /// Deletes the user's reservation and its tickets. `false` if there was no such reservation.
    async fn delete_reservation(&self, user_id: i64, id: i64) -> Result<bool, StoreError>;

    /// Ordered by performance, row, seat.
    async fn list_tickets(&self, user_id: i64) -> Result<Vec<Ticket>, StoreError>;
    async fn get_ticket(&self, user_id: i64, id: i64) -> Result<Option<Ticket>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Everything the service needs from a backend.
pub trait Store: HallStore + PlayStore + PerformanceStore + ReservationStore + UserStore {}

impl<T> Store for T where
    T: HallStore + PlayStore + PerformanceStore + ReservationStore + UserStore
{
}
