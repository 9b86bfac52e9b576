//! Seat map: the full grid of a performance's hall annotated with occupancy.
//!
//! Never cached. Each build reads the current ticket set in one query, so a
//! map built right after a booking or cancellation reflects it.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::geometry::{HallGeometry, SeatCoord};
use crate::models::PerformanceDetails;
use crate::store::{ReservationStore, Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatState {
    pub row: i32,
    pub seat: i32,
    pub is_taken: bool,
}

/// Rows ordered 1..=rows, seats within a row ordered 1..=seats_in_row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeatMap {
    rows: Vec<Vec<SeatState>>,
}

impl SeatMap {
    pub fn build(geometry: HallGeometry, taken: &HashSet<SeatCoord>) -> Self {
        let rows = (1..=geometry.rows())
            .map(|row| {
                (1..=geometry.seats_in_row())
                    .map(|seat| SeatState {
                        row,
                        seat,
                        is_taken: taken.contains(&SeatCoord { row, seat }),
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn taken_count(&self) -> usize {
        self.rows.iter().flatten().filter(|s| s.is_taken).count()
    }

    pub fn free_count(&self) -> usize {
        self.rows.iter().flatten().filter(|s| !s.is_taken).count()
    }
}

#[derive(Clone)]
pub struct SeatMapService {
    store: Arc<dyn Store>,
}

impl SeatMapService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn for_performance(
        &self,
        performance: &PerformanceDetails,
    ) -> Result<SeatMap, StoreError> {
        let taken = self.store.taken_seats(performance.id).await?;
        let map = SeatMap::build(performance.theatre_hall.geometry(), &taken);
        debug!(
            performance_id = performance.id,
            taken = map.taken_count(),
            free = map.free_count(),
            "Built seat map"
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::hash_set;
    use proptest::prelude::*;

    #[test]
    fn marks_exactly_the_taken_seats() {
        let taken = HashSet::from([SeatCoord::new(1, 1), SeatCoord::new(1, 2)]);
        let map = SeatMap::build(HallGeometry::new(3, 4), &taken);

        assert_eq!(map.rows.len(), 3);
        assert!(map.rows.iter().all(|r| r.len() == 4));
        assert_eq!(map.taken_count(), 2);
        assert_eq!(map.free_count(), 10);
        let first_row: Vec<bool> = map.rows[0].iter().map(|s| s.is_taken).collect();
        assert_eq!(first_row, vec![true, true, false, false]);
        assert!(map.rows[1..].iter().flatten().all(|s| !s.is_taken));
    }

    #[test]
    fn serializes_as_nested_grid() {
        let map = SeatMap::build(HallGeometry::new(1, 2), &HashSet::from([SeatCoord::new(1, 2)]));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!([[
                {"row": 1, "seat": 1, "is_taken": false},
                {"row": 1, "seat": 2, "is_taken": true}
            ]])
        );
    }

    proptest! {
        #[test]
        fn grid_shape_and_occupancy(
            rows in 1i32..15,
            seats in 1i32..15,
            picks in hash_set((1i32..15, 1i32..15), 0..40),
        ) {
            let geometry = HallGeometry::new(rows, seats);
            let taken: HashSet<SeatCoord> = picks.into_iter().map(SeatCoord::from).collect();
            let map = SeatMap::build(geometry, &taken);

            prop_assert_eq!(map.rows.len(), rows as usize);
            for (r, row) in map.rows.iter().enumerate() {
                prop_assert_eq!(row.len(), seats as usize);
                for (s, state) in row.iter().enumerate() {
                    prop_assert_eq!(state.row, r as i32 + 1);
                    prop_assert_eq!(state.seat, s as i32 + 1);
                    let expected = taken.contains(&SeatCoord::new(state.row, state.seat));
                    prop_assert_eq!(state.is_taken, expected);
                }
            }
        }
    }
}
