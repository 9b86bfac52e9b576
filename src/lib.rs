pub mod config;
pub mod controllers;
pub mod database;
pub mod geometry;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use services::{BookingService, SeatMapService};
use store::Store;

// Shared state for the whole application
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub booking: BookingService,
    pub seat_maps: SeatMapService,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            booking: BookingService::new(store.clone()),
            seat_maps: SeatMapService::new(store.clone()),
            store,
            config,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Theatre Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
