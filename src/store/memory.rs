//! In-memory store.
//!
//! All tables live behind one mutex, so each operation is serialized. The
//! ticket uniqueness index is checked on insert inside a [`Transaction`] that
//! undoes its own writes unless committed, giving the same all-or-nothing
//! behaviour as a database transaction.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

use super::{HallStore, PerformanceStore, PlayStore, ReservationStore, StoreError, UserStore};
use crate::geometry::SeatCoord;
use crate::models::{
    NewHall, NewPerformance, NewPlay, NewUser, Performance, PerformanceDetails, PerformanceFilter,
    Play, PlayChanges, Reservation, TheatreHall, Ticket, User,
};

#[derive(Debug, Default)]
struct Tables {
    seq: i64,
    users: BTreeMap<i64, User>,
    halls: BTreeMap<i64, TheatreHall>,
    plays: BTreeMap<i64, Play>,
    performances: BTreeMap<i64, Performance>,
    reservations: BTreeMap<i64, Reservation>,
    tickets: BTreeMap<i64, Ticket>,
    // performance_id -> seats holding a ticket
    seat_index: HashMap<i64, HashSet<SeatCoord>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn details(&self, performance: &Performance) -> Option<PerformanceDetails> {
        let play = self.plays.get(&performance.play_id)?;
        let hall = self.halls.get(&performance.theatre_hall_id)?;
        Some(PerformanceDetails {
            id: performance.id,
            show_time: performance.show_time,
            play: play.clone(),
            theatre_hall: hall.clone(),
        })
    }

    fn with_tickets(&self, reservation: &Reservation) -> Reservation {
        let mut reservation = reservation.clone();
        reservation.tickets = self
            .tickets
            .values()
            .filter(|t| t.reservation_id == reservation.id)
            .cloned()
            .collect();
        reservation
    }

    fn release_seat(&mut self, performance_id: i64, coord: SeatCoord) {
        if let Some(seats) = self.seat_index.get_mut(&performance_id) {
            seats.remove(&coord);
            if seats.is_empty() {
                self.seat_index.remove(&performance_id);
            }
        }
    }

    fn timeslot_taken(&self, hall_id: i64, show_time: DateTime<Utc>, except: Option<i64>) -> bool {
        self.performances
            .values()
            .any(|p| {
                p.theatre_hall_id == hall_id && p.show_time == show_time && Some(p.id) != except
            })
    }
}

enum Undo {
    Reservation(i64),
    Ticket(i64),
}

/// Scoped write unit over the locked tables. Dropping it without
/// [`Transaction::commit`] reverts every write made through it.
struct Transaction<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    fn begin(tables: MutexGuard<'a, Tables>) -> Self {
        Self {
            tables,
            undo: Vec::new(),
            committed: false,
        }
    }

    fn insert_reservation(&mut self, user_id: i64) -> Reservation {
        let reservation = Reservation {
            id: self.tables.next_id(),
            user_id,
            created_at: Utc::now(),
            tickets: Vec::new(),
        };
        self.tables.reservations.insert(reservation.id, reservation.clone());
        self.undo.push(Undo::Reservation(reservation.id));
        reservation
    }

    fn insert_ticket(
        &mut self,
        performance_id: i64,
        reservation_id: i64,
        coord: SeatCoord,
    ) -> Result<Ticket, StoreError> {
        if coord.row <= 0 || coord.seat <= 0 {
            return Err(StoreError::Invalid(format!(
                "row and seat must be positive, got row={}, seat={}",
                coord.row, coord.seat
            )));
        }
        if !self.tables.seat_index.entry(performance_id).or_default().insert(coord) {
            return Err(StoreError::SeatTaken(coord));
        }
        let ticket = Ticket {
            id: self.tables.next_id(),
            performance_id,
            reservation_id,
            row: coord.row,
            seat: coord.seat,
        };
        self.tables.tickets.insert(ticket.id, ticket.clone());
        self.undo.push(Undo::Ticket(ticket.id));
        Ok(ticket)
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Ticket(id) => {
                    if let Some(ticket) = self.tables.tickets.remove(&id) {
                        self.tables.release_seat(ticket.performance_id, ticket.coord());
                    }
                }
                Undo::Reservation(id) => {
                    self.tables.reservations.remove(&id);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket_count(&self) -> usize {
        self.tables.lock().tickets.len()
    }

    pub fn reservation_count(&self) -> usize {
        self.tables.lock().reservations.len()
    }
}

#[async_trait]
impl HallStore for InMemoryStore {
    async fn create_hall(&self, hall: NewHall) -> Result<TheatreHall, StoreError> {
        let mut tables = self.tables.lock();
        if tables.halls.values().any(|h| h.name == hall.name) {
            return Err(StoreError::Duplicate(format!("hall named {:?} already exists", hall.name)));
        }
        let hall = TheatreHall {
            id: tables.next_id(),
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
        };
        tables.halls.insert(hall.id, hall.clone());
        Ok(hall)
    }

    async fn get_hall(&self, id: i64) -> Result<Option<TheatreHall>, StoreError> {
        Ok(self.tables.lock().halls.get(&id).cloned())
    }

    async fn find_hall_by_name(&self, name: &str) -> Result<Option<TheatreHall>, StoreError> {
        Ok(self.tables.lock().halls.values().find(|h| h.name == name).cloned())
    }

    async fn list_halls(&self) -> Result<Vec<TheatreHall>, StoreError> {
        let mut halls: Vec<_> = self.tables.lock().halls.values().cloned().collect();
        halls.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(halls)
    }

    async fn rename_hall(&self, id: i64, name: String) -> Result<TheatreHall, StoreError> {
        let mut tables = self.tables.lock();
        if tables.halls.values().any(|h| h.name == name && h.id != id) {
            return Err(StoreError::Duplicate(format!("hall named {name:?} already exists")));
        }
        let hall = tables
            .halls
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "hall", id })?;
        hall.name = name;
        Ok(hall.clone())
    }

    async fn delete_hall(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if !tables.halls.contains_key(&id) {
            return Err(StoreError::NotFound { entity: "hall", id });
        }
        if tables.performances.values().any(|p| p.theatre_hall_id == id) {
            return Err(StoreError::Protected {
                entity: "hall",
                id,
                dependents: "performances",
            });
        }
        tables.halls.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PlayStore for InMemoryStore {
    async fn create_play(&self, play: NewPlay) -> Result<Play, StoreError> {
        let mut tables = self.tables.lock();
        if tables.plays.values().any(|p| p.title == play.title) {
            return Err(StoreError::Duplicate(format!(
                "play titled {:?} already exists",
                play.title
            )));
        }
        let play = Play {
            id: tables.next_id(),
            title: play.title,
            description: play.description,
        };
        tables.plays.insert(play.id, play.clone());
        Ok(play)
    }

    async fn get_play(&self, id: i64) -> Result<Option<Play>, StoreError> {
        Ok(self.tables.lock().plays.get(&id).cloned())
    }

    async fn find_play_by_title(&self, title: &str) -> Result<Option<Play>, StoreError> {
        Ok(self.tables.lock().plays.values().find(|p| p.title == title).cloned())
    }

    async fn list_plays(&self) -> Result<Vec<Play>, StoreError> {
        let mut plays: Vec<_> = self.tables.lock().plays.values().cloned().collect();
        plays.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(plays)
    }

    async fn update_play(&self, id: i64, changes: PlayChanges) -> Result<Play, StoreError> {
        let mut tables = self.tables.lock();
        if let Some(ref title) = changes.title {
            if tables.plays.values().any(|p| &p.title == title && p.id != id) {
                return Err(StoreError::Duplicate(format!("play titled {title:?} already exists")));
            }
        }
        let play = tables
            .plays
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "play", id })?;
        if let Some(title) = changes.title {
            play.title = title;
        }
        if let Some(description) = changes.description {
            play.description = description;
        }
        Ok(play.clone())
    }

    async fn delete_play(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if !tables.plays.contains_key(&id) {
            return Err(StoreError::NotFound { entity: "play", id });
        }
        if tables.performances.values().any(|p| p.play_id == id) {
            return Err(StoreError::Protected {
                entity: "play",
                id,
                dependents: "performances",
            });
        }
        tables.plays.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for InMemoryStore {
    async fn create_performance(
        &self,
        performance: NewPerformance,
    ) -> Result<Performance, StoreError> {
        let mut tables = self.tables.lock();
        if !tables.plays.contains_key(&performance.play_id) {
            return Err(StoreError::NotFound {
                entity: "play",
                id: performance.play_id,
            });
        }
        if !tables.halls.contains_key(&performance.theatre_hall_id) {
            return Err(StoreError::NotFound {
                entity: "hall",
                id: performance.theatre_hall_id,
            });
        }
        if tables.timeslot_taken(performance.theatre_hall_id, performance.show_time, None) {
            return Err(StoreError::Duplicate(
                "the hall already has a performance at that time".to_string(),
            ));
        }
        let performance = Performance {
            id: tables.next_id(),
            play_id: performance.play_id,
            theatre_hall_id: performance.theatre_hall_id,
            show_time: performance.show_time,
        };
        tables.performances.insert(performance.id, performance.clone());
        Ok(performance)
    }

    async fn get_performance(&self, id: i64) -> Result<Option<PerformanceDetails>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.performances.get(&id).and_then(|p| tables.details(p)))
    }

    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
    ) -> Result<Vec<PerformanceDetails>, StoreError> {
        let tables = self.tables.lock();
        let mut performances: Vec<_> = tables
            .performances
            .values()
            .filter_map(|p| tables.details(p))
            .filter(|d| filter.matches(d))
            .collect();
        performances.sort_by(|a, b| a.show_time.cmp(&b.show_time).then(a.id.cmp(&b.id)));
        Ok(performances)
    }

    async fn reschedule_performance(
        &self,
        id: i64,
        show_time: DateTime<Utc>,
    ) -> Result<Performance, StoreError> {
        let mut tables = self.tables.lock();
        let hall_id = tables
            .performances
            .get(&id)
            .map(|p| p.theatre_hall_id)
            .ok_or(StoreError::NotFound { entity: "performance", id })?;
        if tables.timeslot_taken(hall_id, show_time, Some(id)) {
            return Err(StoreError::Duplicate(
                "the hall already has a performance at that time".to_string(),
            ));
        }
        let performance = tables
            .performances
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "performance", id })?;
        performance.show_time = show_time;
        Ok(performance.clone())
    }

    async fn delete_performance(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if !tables.performances.contains_key(&id) {
            return Err(StoreError::NotFound { entity: "performance", id });
        }
        if tables.tickets.values().any(|t| t.performance_id == id) {
            return Err(StoreError::Protected {
                entity: "performance",
                id,
                dependents: "tickets",
            });
        }
        tables.performances.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn taken_seats(&self, performance_id: i64) -> Result<HashSet<SeatCoord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .seat_index
            .get(&performance_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_reservation(
        &self,
        user_id: i64,
        performance_id: i64,
        seats: &[SeatCoord],
    ) -> Result<Reservation, StoreError> {
        let mut tx = Transaction::begin(self.tables.lock());
        if !tx.tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound { entity: "user", id: user_id });
        }
        if !tx.tables.performances.contains_key(&performance_id) {
            return Err(StoreError::NotFound {
                entity: "performance",
                id: performance_id,
            });
        }

        let mut reservation = tx.insert_reservation(user_id);
        for &coord in seats {
            let ticket = tx.insert_ticket(performance_id, reservation.id, coord)?;
            reservation.tickets.push(ticket);
        }
        tx.commit();
        Ok(reservation)
    }

    async fn list_reservations(&self, user_id: i64) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .reservations
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .map(|r| tables.with_tickets(r))
            .collect())
    }

    async fn get_reservation(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Reservation>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .map(|r| tables.with_tickets(r)))
    }

    async fn delete_reservation(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        if !tables.reservations.get(&id).is_some_and(|r| r.user_id == user_id) {
            return Ok(false);
        }
        tables.reservations.remove(&id);
        let owned: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| t.reservation_id == id)
            .cloned()
            .collect();
        for ticket in owned {
            tables.tickets.remove(&ticket.id);
            tables.release_seat(ticket.performance_id, ticket.coord());
        }
        Ok(true)
    }

    async fn list_tickets(&self, user_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.lock();
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| {
                tables
                    .reservations
                    .get(&t.reservation_id)
                    .is_some_and(|r| r.user_id == user_id)
            })
            .cloned()
            .collect();
        tickets.sort_by_key(|t| (t.performance_id, t.row, t.seat));
        Ok(tickets)
    }

    async fn get_ticket(&self, user_id: i64, id: i64) -> Result<Option<Ticket>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .tickets
            .get(&id)
            .filter(|t| {
                tables
                    .reservations
                    .get(&t.reservation_id)
                    .is_some_and(|r| r.user_id == user_id)
            })
            .cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("user {:?} already exists", user.username)));
        }
        let user = User {
            id: tables.next_id(),
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn seeded() -> (InMemoryStore, i64, i64) {
        let store = InMemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                password_hash: String::new(),
                is_admin: false,
            })
            .await
            .unwrap();
        let hall = store
            .create_hall(NewHall { name: "Main".into(), rows: 3, seats_in_row: 4 })
            .await
            .unwrap();
        let play = store
            .create_play(NewPlay { title: "Hamlet".into(), description: String::new() })
            .await
            .unwrap();
        let performance = store
            .create_performance(NewPerformance {
                play_id: play.id,
                theatre_hall_id: hall.id,
                show_time: Utc.with_ymd_and_hms(2030, 1, 1, 19, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        (store, user.id, performance.id)
    }

    #[tokio::test]
    async fn conflicting_commit_leaves_nothing_behind() {
        let (store, user, perf) = seeded().await;
        store
            .commit_reservation(user, perf, &[SeatCoord::new(2, 2)])
            .await
            .unwrap();

        let err = store
            .commit_reservation(
                user,
                perf,
                &[SeatCoord::new(1, 1), SeatCoord::new(2, 2), SeatCoord::new(3, 3)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SeatTaken(c) if c == SeatCoord::new(2, 2)));

        assert_eq!(store.reservation_count(), 1);
        assert_eq!(store.ticket_count(), 1);
        let taken = store.taken_seats(perf).await.unwrap();
        assert_eq!(taken, HashSet::from([SeatCoord::new(2, 2)]));
    }

    #[tokio::test]
    async fn deleting_reservation_frees_its_seats() {
        let (store, user, perf) = seeded().await;
        let reservation = store
            .commit_reservation(user, perf, &[SeatCoord::new(1, 1), SeatCoord::new(1, 2)])
            .await
            .unwrap();

        assert!(store.delete_reservation(user, reservation.id).await.unwrap());
        assert!(store.taken_seats(perf).await.unwrap().is_empty());
        assert_eq!(store.ticket_count(), 0);
        assert!(!store.delete_reservation(user, reservation.id).await.unwrap());
    }

    #[tokio::test]
    async fn only_owner_sees_or_deletes_reservation() {
        let (store, user, perf) = seeded().await;
        let other = store
            .create_user(NewUser {
                username: "bob".into(),
                password_hash: String::new(),
                is_admin: false,
            })
            .await
            .unwrap();
        let reservation = store
            .commit_reservation(user, perf, &[SeatCoord::new(1, 1)])
            .await
            .unwrap();

        assert!(store.get_reservation(other.id, reservation.id).await.unwrap().is_none());
        assert!(!store.delete_reservation(other.id, reservation.id).await.unwrap());
        assert!(store.list_tickets(other.id).await.unwrap().is_empty());
        assert_eq!(store.list_tickets(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn performance_with_tickets_is_protected() {
        let (store, user, perf) = seeded().await;
        store
            .commit_reservation(user, perf, &[SeatCoord::new(1, 1)])
            .await
            .unwrap();
        let err = store.delete_performance(perf).await.unwrap_err();
        assert!(matches!(err, StoreError::Protected { entity: "performance", .. }));
    }

    #[tokio::test]
    async fn hall_timeslot_is_unique() {
        let (store, _, perf) = seeded().await;
        let existing = store.get_performance(perf).await.unwrap().unwrap();
        let err = store
            .create_performance(NewPerformance {
                play_id: existing.play.id,
                theatre_hall_id: existing.theatre_hall.id,
                show_time: existing.show_time,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn seat_index_is_kept_per_performance() {
        let (store, user, perf) = seeded().await;
        let existing = store.get_performance(perf).await.unwrap().unwrap();
        let later = store
            .create_performance(NewPerformance {
                play_id: existing.play.id,
                theatre_hall_id: existing.theatre_hall.id,
                show_time: existing.show_time + chrono::Duration::hours(3),
            })
            .await
            .unwrap();

        let first = store
            .commit_reservation(user, perf, &[SeatCoord::new(2, 2)])
            .await
            .unwrap();
        store
            .commit_reservation(user, later.id, &[SeatCoord::new(2, 2), SeatCoord::new(3, 4)])
            .await
            .unwrap();

        assert_eq!(store.taken_seats(perf).await.unwrap(), HashSet::from([SeatCoord::new(2, 2)]));
        assert_eq!(store.taken_seats(later.id).await.unwrap().len(), 2);

        assert!(store.delete_reservation(user, first.id).await.unwrap());
        assert!(store.taken_seats(perf).await.unwrap().is_empty());
        assert!(!store.tables.lock().seat_index.contains_key(&perf));
        assert_eq!(store.taken_seats(later.id).await.unwrap().len(), 2);
    }
}
