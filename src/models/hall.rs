use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::geometry::HallGeometry;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TheatreHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl TheatreHall {
    pub fn geometry(&self) -> HallGeometry {
        HallGeometry::new(self.rows, self.seats_in_row)
    }

    pub fn capacity(&self) -> i64 {
        self.geometry().capacity()
    }

    // Whether (row, seat) lies inside this hall's grid
    pub fn validate(&self, row: i32, seat: i32) -> bool {
        self.geometry().validate(row, seat)
    }
}

#[derive(Debug, Clone)]
pub struct NewHall {
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}
