//! PostgreSQL store.
//!
//! The schema in `src/migrations` carries the invariants: the
//! `unique_seat_per_performance` constraint arbitrates seat conflicts,
//! `ON DELETE CASCADE` removes tickets with their reservation and
//! `ON DELETE RESTRICT` protects performances, halls and plays that are still
//! referenced.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{HallStore, PerformanceStore, PlayStore, ReservationStore, StoreError, UserStore};
use crate::database::Database;
use crate::geometry::SeatCoord;
use crate::models::{
    NewHall, NewPerformance, NewPlay, NewUser, Performance, PerformanceDetails, PerformanceFilter,
    Play, PlayChanges, Reservation, TheatreHall, Ticket, User,
};

const SEAT_CONSTRAINT: &str = "unique_seat_per_performance";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool.clone() }
    }
}

enum Violation<'a> {
    Unique(Option<&'a str>),
    ForeignKey(Option<&'a str>),
    Check,
    Deadlock,
}

const DEADLOCK_DETECTED: &str = "40P01";

fn violation(err: &sqlx::Error) -> Option<Violation<'_>> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.is_unique_violation() {
        Some(Violation::Unique(db_err.constraint()))
    } else if db_err.is_foreign_key_violation() {
        Some(Violation::ForeignKey(db_err.constraint()))
    } else if db_err.is_check_violation() {
        Some(Violation::Check)
    } else if db_err.code().as_deref() == Some(DEADLOCK_DETECTED) {
        Some(Violation::Deadlock)
    } else {
        None
    }
}

// Unique violations on writes other than tickets
fn duplicate_or(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match violation(&err) {
        Some(Violation::Unique(_)) => StoreError::Duplicate(message()),
        _ => StoreError::Database(err),
    }
}

// ON DELETE RESTRICT violations
fn protected_or(
    err: sqlx::Error,
    entity: &'static str,
    id: i64,
    dependents: &'static str,
) -> StoreError {
    match violation(&err) {
        Some(Violation::ForeignKey(_)) => StoreError::Protected { entity, id, dependents },
        _ => StoreError::Database(err),
    }
}

#[derive(FromRow)]
struct PerformanceRow {
    id: i64,
    show_time: DateTime<Utc>,
    play_id: i64,
    play_title: String,
    play_description: String,
    hall_id: i64,
    hall_name: String,
    hall_rows: i32,
    hall_seats_in_row: i32,
}

impl From<PerformanceRow> for PerformanceDetails {
    fn from(row: PerformanceRow) -> Self {
        PerformanceDetails {
            id: row.id,
            show_time: row.show_time,
            play: Play {
                id: row.play_id,
                title: row.play_title,
                description: row.play_description,
            },
            theatre_hall: TheatreHall {
                id: row.hall_id,
                name: row.hall_name,
                rows: row.hall_rows,
                seats_in_row: row.hall_seats_in_row,
            },
        }
    }
}

const PERFORMANCE_SELECT: &str = r#"
    SELECT p.id, p.show_time,
           pl.id AS play_id, pl.title AS play_title, pl.description AS play_description,
           h.id AS hall_id, h.name AS hall_name,
           h.rows AS hall_rows, h.seats_in_row AS hall_seats_in_row
    FROM performances p
    JOIN plays pl ON pl.id = p.play_id
    JOIN theatre_halls h ON h.id = p.theatre_hall_id
"#;

#[async_trait]
impl HallStore for PgStore {
    async fn create_hall(&self, hall: NewHall) -> Result<TheatreHall, StoreError> {
        sqlx::query_as::<_, TheatreHall>(
            "INSERT INTO theatre_halls (name, rows, seats_in_row)
             VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(&hall.name)
        .bind(hall.rows)
        .bind(hall.seats_in_row)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, || format!("hall named {:?} already exists", hall.name)))
    }

    async fn get_hall(&self, id: i64) -> Result<Option<TheatreHall>, StoreError> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_hall_by_name(&self, name: &str) -> Result<Option<TheatreHall>, StoreError> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_halls(&self) -> Result<Vec<TheatreHall>, StoreError> {
        Ok(sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn rename_hall(&self, id: i64, name: String) -> Result<TheatreHall, StoreError> {
        sqlx::query_as::<_, TheatreHall>(
            "UPDATE theatre_halls SET name = $2 WHERE id = $1
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(id)
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, || format!("hall named {name:?} already exists")))?
        .ok_or(StoreError::NotFound { entity: "hall", id })
    }

    async fn delete_hall(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM theatre_halls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| protected_or(e, "hall", id, "performances"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "hall", id });
        }
        Ok(())
    }
}

#[async_trait]
impl PlayStore for PgStore {
    async fn create_play(&self, play: NewPlay) -> Result<Play, StoreError> {
        sqlx::query_as::<_, Play>(
            "INSERT INTO plays (title, description) VALUES ($1, $2)
             RETURNING id, title, description",
        )
        .bind(&play.title)
        .bind(&play.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, || format!("play titled {:?} already exists", play.title)))
    }

    async fn get_play(&self, id: i64) -> Result<Option<Play>, StoreError> {
        Ok(sqlx::query_as::<_, Play>("SELECT id, title, description FROM plays WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_play_by_title(&self, title: &str) -> Result<Option<Play>, StoreError> {
        Ok(sqlx::query_as::<_, Play>("SELECT id, title, description FROM plays WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_plays(&self) -> Result<Vec<Play>, StoreError> {
        Ok(sqlx::query_as::<_, Play>("SELECT id, title, description FROM plays ORDER BY title")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_play(&self, id: i64, changes: PlayChanges) -> Result<Play, StoreError> {
        let title = changes.title.clone();
        sqlx::query_as::<_, Play>(
            "UPDATE plays
             SET title = COALESCE($2, title), description = COALESCE($3, description)
             WHERE id = $1
             RETURNING id, title, description",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or(e, || {
                format!("play titled {:?} already exists", title.unwrap_or_default())
            })
        })?
        .ok_or(StoreError::NotFound { entity: "play", id })
    }

    async fn delete_play(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM plays WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| protected_or(e, "play", id, "performances"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "play", id });
        }
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for PgStore {
    async fn create_performance(
        &self,
        performance: NewPerformance,
    ) -> Result<Performance, StoreError> {
        sqlx::query_as::<_, Performance>(
            "INSERT INTO performances (play_id, theatre_hall_id, show_time)
             VALUES ($1, $2, $3)
             RETURNING id, play_id, theatre_hall_id, show_time",
        )
        .bind(performance.play_id)
        .bind(performance.theatre_hall_id)
        .bind(performance.show_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique(_)) => {
                StoreError::Duplicate("the hall already has a performance at that time".to_string())
            }
            Some(Violation::ForeignKey(Some("performances_play_id_fkey"))) => StoreError::NotFound {
                entity: "play",
                id: performance.play_id,
            },
            Some(Violation::ForeignKey(_)) => StoreError::NotFound {
                entity: "hall",
                id: performance.theatre_hall_id,
            },
            _ => StoreError::Database(e),
        })
    }

    async fn get_performance(&self, id: i64) -> Result<Option<PerformanceDetails>, StoreError> {
        let query = format!("{PERFORMANCE_SELECT} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PerformanceRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_performances(
        &self,
        filter: &PerformanceFilter,
    ) -> Result<Vec<PerformanceDetails>, StoreError> {
        let query = format!(
            "{PERFORMANCE_SELECT}
             WHERE ($1::timestamptz IS NULL OR p.show_time >= $1)
               AND ($2::timestamptz IS NULL OR p.show_time <= $2)
               AND ($3::text IS NULL OR strpos(lower(pl.title), lower($3)) > 0)
               AND ($4::text IS NULL OR strpos(lower(h.name), lower($4)) > 0)
             ORDER BY p.show_time, p.id"
        );
        let rows = sqlx::query_as::<_, PerformanceRow>(&query)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(filter.play.as_deref())
            .bind(filter.hall.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn reschedule_performance(
        &self,
        id: i64,
        show_time: DateTime<Utc>,
    ) -> Result<Performance, StoreError> {
        sqlx::query_as::<_, Performance>(
            "UPDATE performances SET show_time = $2 WHERE id = $1
             RETURNING id, play_id, theatre_hall_id, show_time",
        )
        .bind(id)
        .bind(show_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            duplicate_or(e, || "the hall already has a performance at that time".to_string())
        })?
        .ok_or(StoreError::NotFound { entity: "performance", id })
    }

    async fn delete_performance(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM performances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| protected_or(e, "performance", id, "tickets"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "performance", id });
        }
        Ok(())
    }
}

impl PgStore {
    async fn attach_tickets(
        &self,
        reservations: Vec<Reservation>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, performance_id, reservation_id, row, seat
             FROM tickets WHERE reservation_id = ANY($1)
             ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_reservation: BTreeMap<i64, Vec<Ticket>> = BTreeMap::new();
        for ticket in tickets {
            by_reservation.entry(ticket.reservation_id).or_default().push(ticket);
        }
        Ok(reservations
            .into_iter()
            .map(|mut r| {
                r.tickets = by_reservation.remove(&r.id).unwrap_or_default();
                r
            })
            .collect())
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn taken_seats(&self, performance_id: i64) -> Result<HashSet<SeatCoord>, StoreError> {
        let pairs = sqlx::query_as::<_, (i32, i32)>(
            "SELECT row, seat FROM tickets WHERE performance_id = $1",
        )
        .bind(performance_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pairs.into_iter().map(SeatCoord::from).collect())
    }

    async fn commit_reservation(
        &self,
        user_id: i64,
        performance_id: i64,
        seats: &[SeatCoord],
    ) -> Result<Reservation, StoreError> {
        // Any early return drops `tx`, which rolls the whole reservation back.
        let mut tx = self.pool.begin().await?;

        let mut reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id) VALUES ($1)
             RETURNING id, user_id, created_at",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::ForeignKey(_)) => StoreError::NotFound { entity: "user", id: user_id },
            _ => StoreError::Database(e),
        })?;

        // Concurrent requests lock seats in the same order, so overlapping
        // requests conflict on the unique index instead of deadlocking.
        let mut ordered = seats.to_vec();
        ordered.sort_unstable();

        let mut tickets = HashMap::with_capacity(ordered.len());
        for coord in ordered {
            let ticket = sqlx::query_as::<_, Ticket>(
                "INSERT INTO tickets (performance_id, reservation_id, row, seat)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, performance_id, reservation_id, row, seat",
            )
            .bind(performance_id)
            .bind(reservation.id)
            .bind(coord.row)
            .bind(coord.seat)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match violation(&e) {
                Some(Violation::Unique(Some(SEAT_CONSTRAINT))) | Some(Violation::Deadlock) => {
                    StoreError::SeatTaken(coord)
                }
                Some(Violation::ForeignKey(_)) => StoreError::NotFound {
                    entity: "performance",
                    id: performance_id,
                },
                Some(Violation::Check) => StoreError::Invalid(format!(
                    "row and seat must be positive, got row={}, seat={}",
                    coord.row, coord.seat
                )),
                _ => StoreError::Database(e),
            })?;
            tickets.insert(coord, ticket);
        }

        tx.commit().await?;
        reservation.tickets = seats.iter().filter_map(|coord| tickets.remove(coord)).collect();
        Ok(reservation)
    }

    async fn list_reservations(&self, user_id: i64) -> Result<Vec<Reservation>, StoreError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, created_at FROM reservations
             WHERE user_id = $1
             ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_tickets(reservations).await
    }

    async fn get_reservation(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Reservation>, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT id, user_id, created_at FROM reservations WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        match reservation {
            Some(r) => Ok(self.attach_tickets(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_reservation(&self, user_id: i64, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tickets(&self, user_id: i64) -> Result<Vec<Ticket>, StoreError> {
        Ok(sqlx::query_as::<_, Ticket>(
            "SELECT t.id, t.performance_id, t.reservation_id, t.row, t.seat
             FROM tickets t
             JOIN reservations r ON r.id = t.reservation_id
             WHERE r.user_id = $1
             ORDER BY t.performance_id, t.row, t.seat",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_ticket(&self, user_id: i64, id: i64) -> Result<Option<Ticket>, StoreError> {
        Ok(sqlx::query_as::<_, Ticket>(
            "SELECT t.id, t.performance_id, t.reservation_id, t.row, t.seat
             FROM tickets t
             JOIN reservations r ON r.id = t.reservation_id
             WHERE t.id = $1 AND r.user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, is_admin) VALUES ($1, $2, $3)
             RETURNING id, username, password_hash, is_admin",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, || format!("user {:?} already exists", user.username)))
    }
}
