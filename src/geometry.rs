//! Hall geometry: the rectangular seat grid of a theatre hall.
//!
//! Rows and seats are 1-indexed. Coordinates are plain `i32` because that is
//! what travels over the wire and into PostgreSQL `INTEGER` columns; anything
//! below 1 is simply outside the grid.

use serde::{Deserialize, Serialize};

/// One seat coordinate inside a hall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatCoord {
    pub row: i32,
    pub seat: i32,
}

impl SeatCoord {
    pub const fn new(row: i32, seat: i32) -> Self {
        Self { row, seat }
    }
}

impl From<(i32, i32)> for SeatCoord {
    fn from((row, seat): (i32, i32)) -> Self {
        Self { row, seat }
    }
}

/// A seat as it arrives in a request body, before it is checked against a
/// hall. Wider than [`SeatCoord`] so an oversized number is reported as a seat
/// outside the hall rather than as a malformed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestedSeat {
    pub row: i64,
    pub seat: i64,
}

impl RequestedSeat {
    pub const fn new(row: i64, seat: i64) -> Self {
        Self { row, seat }
    }
}

impl From<SeatCoord> for RequestedSeat {
    fn from(coord: SeatCoord) -> Self {
        Self {
            row: i64::from(coord.row),
            seat: i64::from(coord.seat),
        }
    }
}

/// Shape of a hall: `rows` x `seats_in_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallGeometry {
    rows: i32,
    seats_in_row: i32,
}

impl HallGeometry {
    /// A grid with a non-positive dimension is empty: it validates nothing.
    pub const fn new(rows: i32, seats_in_row: i32) -> Self {
        Self { rows, seats_in_row }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn seats_in_row(&self) -> i32 {
        self.seats_in_row
    }

    pub fn capacity(&self) -> i64 {
        i64::from(self.rows.max(0)) * i64::from(self.seats_in_row.max(0))
    }

    /// True iff `1 <= row <= rows` and `1 <= seat <= seats_in_row`.
    pub fn validate(&self, row: i32, seat: i32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_in_row).contains(&seat)
    }

    pub fn contains(&self, coord: SeatCoord) -> bool {
        self.validate(coord.row, coord.seat)
    }

    /// The coordinate of a requested seat, or `None` if it lies outside the grid.
    pub fn locate(&self, requested: RequestedSeat) -> Option<SeatCoord> {
        let row = i32::try_from(requested.row).ok()?;
        let seat = i32::try_from(requested.seat).ok()?;
        self.validate(row, seat).then_some(SeatCoord { row, seat })
    }

    /// All valid coordinates, row-major.
    pub fn coords(&self) -> impl Iterator<Item = SeatCoord> + '_ {
        (1..=self.rows).flat_map(move |row| {
            (1..=self.seats_in_row).map(move |seat| SeatCoord { row, seat })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn locate_rejects_values_beyond_i32() {
        let hall = HallGeometry::new(3, 4);
        assert_eq!(hall.locate(RequestedSeat::new(2, 3)), Some(SeatCoord::new(2, 3)));
        assert_eq!(hall.locate(RequestedSeat::new(3_000_000_000, 1)), None);
        assert_eq!(hall.locate(RequestedSeat::new(1, i64::MIN)), None);
        assert_eq!(hall.locate(RequestedSeat::new(1 << 32 | 1, 1)), None);
        assert_eq!(hall.locate(RequestedSeat::new(0, 1)), None);
    }

    #[test]
    fn empty_grid_validates_nothing() {
        let hall = HallGeometry::new(0, 4);
        assert!(!hall.validate(1, 1));
        assert_eq!(hall.capacity(), 0);
        assert_eq!(hall.coords().count(), 0);
    }

    #[test]
    fn corners_of_three_by_four() {
        let hall = HallGeometry::new(3, 4);
        assert!(hall.validate(1, 1));
        assert!(hall.validate(3, 4));
        assert!(!hall.validate(0, 1));
        assert!(!hall.validate(4, 1));
        assert!(!hall.validate(1, 5));
        assert!(!hall.validate(1, 0));
        assert_eq!(hall.capacity(), 12);
    }

    #[test]
    fn coords_are_row_major() {
        let hall = HallGeometry::new(2, 2);
        let coords: Vec<_> = hall.coords().collect();
        assert_eq!(
            coords,
            vec![
                SeatCoord::new(1, 1),
                SeatCoord::new(1, 2),
                SeatCoord::new(2, 1),
                SeatCoord::new(2, 2),
            ]
        );
    }

    proptest! {
        #[test]
        fn validate_matches_bounds(
            rows in 1i32..200,
            seats in 1i32..200,
            r in -5i32..210,
            s in -5i32..210,
        ) {
            let hall = HallGeometry::new(rows, seats);
            let expected = 1 <= r && r <= rows && 1 <= s && s <= seats;
            prop_assert_eq!(hall.validate(r, s), expected);
        }

        #[test]
        fn coords_cover_capacity(rows in 1i32..40, seats in 1i32..40) {
            let hall = HallGeometry::new(rows, seats);
            prop_assert_eq!(hall.coords().count() as i64, hall.capacity());
            prop_assert!(hall.coords().all(|c| hall.contains(c)));
        }
    }
}
