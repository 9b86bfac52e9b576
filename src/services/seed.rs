//! Demo data for local runs. Idempotent: records that already exist (by
//! username, hall name, play title or hall timeslot) are reused.

use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use tracing::info;

use crate::models::{NewHall, NewPerformance, NewPlay, NewUser};
use crate::store::{HallStore, PerformanceStore, PlayStore, Store, StoreError, UserStore};

pub const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin";
const PLAY_TITLE: &str = "Bad Boys 5";
const HALL_NAME: &str = "Main Stage";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub struct SeedService {
    store: Arc<dyn Store>,
}

impl SeedService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn seed_demo_data(&self) -> Result<(), SeedError> {
        if self.store.find_user_by_username(ADMIN_USERNAME).await?.is_none() {
            self.store
                .create_user(NewUser {
                    username: ADMIN_USERNAME.to_string(),
                    password_hash: bcrypt::hash(ADMIN_PASSWORD, bcrypt::DEFAULT_COST)?,
                    is_admin: true,
                })
                .await?;
            info!(username = ADMIN_USERNAME, "Created admin user");
        }

        let play = match self.store.find_play_by_title(PLAY_TITLE).await? {
            Some(play) => play,
            None => {
                self.store
                    .create_play(NewPlay {
                        title: PLAY_TITLE.to_string(),
                        description: "Action".to_string(),
                    })
                    .await?
            }
        };

        let hall = match self.store.find_hall_by_name(HALL_NAME).await? {
            Some(hall) => hall,
            None => {
                self.store
                    .create_hall(NewHall {
                        name: HALL_NAME.to_string(),
                        rows: 10,
                        seats_in_row: 12,
                    })
                    .await?
            }
        };

        // Tomorrow 19:00 UTC, so restarts on the same day hit the same timeslots
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let base = (tomorrow.and_time(NaiveTime::MIN) + Duration::hours(19)).and_utc();
        let mut created = 0;
        for i in 0..3 {
            let show_time = base + Duration::days(i) + Duration::hours(i);
            match self
                .store
                .create_performance(NewPerformance {
                    play_id: play.id,
                    theatre_hall_id: hall.id,
                    show_time,
                })
                .await
            {
                Ok(_) => created += 1,
                Err(StoreError::Duplicate(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(play_id = play.id, hall_id = hall.id, performances = created, "Seeded theatre data");
        Ok(())
    }
}
