use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::geometry::SeatCoord;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub performance_id: i64,
    pub reservation_id: i64,
    pub row: i32,
    pub seat: i32,
}

impl Ticket {
    pub fn coord(&self) -> SeatCoord {
        SeatCoord::new(self.row, self.seat)
    }
}

/// One atomic claim of seats. Owns its tickets.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub tickets: Vec<Ticket>,
}
