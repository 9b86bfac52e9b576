#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{TimeZone, Utc};
use fake::{faker::internet::en::Username, Fake};
use serde_json::Value;
use tower::ServiceExt;

use theatre_booking::{
    build_router,
    config::Config,
    models::{NewHall, NewPerformance, NewPlay, NewUser, PerformanceDetails, TheatreHall},
    store::{HallStore, InMemoryStore, PerformanceStore, PlayStore, Store, UserStore},
    AppState,
};

pub const PASSWORD: &str = "correct horse";

static USER_SEQ: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub state: Arc<AppState>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: i64,
    pub username: String,
    pub password: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let config = Config::from_lookup(|_| None).expect("default config");
        let state = AppState::new(config, dyn_store);
        Self {
            router: build_router(state.clone()),
            store,
            state,
        }
    }

    pub async fn user(&self, is_admin: bool) -> Credentials {
        let base: String = Username().fake();
        let username = format!("{base}_{}", USER_SEQ.fetch_add(1, Ordering::Relaxed));
        // minimum cost keeps the suite fast
        let password_hash = bcrypt::hash(PASSWORD, 4).expect("hash");
        let user = self
            .store
            .create_user(NewUser {
                username: username.clone(),
                password_hash,
                is_admin,
            })
            .await
            .expect("create user");
        Credentials {
            id: user.id,
            username,
            password: PASSWORD.to_string(),
        }
    }

    pub async fn hall(&self, name: &str, rows: i32, seats_in_row: i32) -> TheatreHall {
        self.store
            .create_hall(NewHall {
                name: name.to_string(),
                rows,
                seats_in_row,
            })
            .await
            .expect("create hall")
    }

    /// A 3x4 hall with one performance of one play.
    pub async fn small_performance(&self) -> PerformanceDetails {
        let hall = self.hall("Small Hall", 3, 4).await;
        let play = self
            .store
            .create_play(NewPlay {
                title: "The Seagull".to_string(),
                description: "Comedy in four acts".to_string(),
            })
            .await
            .expect("create play");
        let performance = self
            .store
            .create_performance(NewPerformance {
                play_id: play.id,
                theatre_hall_id: hall.id,
                show_time: Utc.with_ymd_and_hms(2030, 5, 1, 19, 0, 0).unwrap(),
            })
            .await
            .expect("create performance");
        self.store
            .get_performance(performance.id)
            .await
            .expect("get performance")
            .expect("performance exists")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&Credentials>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(creds) = auth {
            let pair = format!("{}:{}", creds.username, creds.password);
            let token = general_purpose::STANDARD.encode(pair);
            builder = builder.header(header::AUTHORIZATION, format!("Basic {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }
}

pub fn seats(pairs: &[(i32, i32)]) -> Value {
    Value::Array(
        pairs
            .iter()
            .map(|(row, seat)| serde_json::json!({ "row": row, "seat": seat }))
            .collect(),
    )
}

/// `is_taken` for one seat of a seat map JSON grid.
pub fn is_taken(seat_map: &Value, row: i32, seat: i32) -> bool {
    seat_map[(row - 1) as usize][(seat - 1) as usize]["is_taken"]
        .as_bool()
        .expect("seat present")
}
