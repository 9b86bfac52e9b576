use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::AppJson;
use super::halls::HallResponse;
use crate::middleware::AdminUser;
use crate::models::{NewPerformance, PerformanceDetails, PerformanceFilter, Play};
use crate::services::SeatMap;
use crate::store::PerformanceStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route(
            "/performances/{id}",
            get(get_performance).patch(reschedule_performance).delete(delete_performance),
        )
        .route("/performances/{id}/seats", get(get_seat_map))
}

#[derive(Debug, Serialize)]
struct PerformanceResponse {
    id: i64,
    show_time: DateTime<Utc>,
    play: Play,
    theatre_hall: HallResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    seat_map: Option<SeatMap>,
}

impl PerformanceResponse {
    fn new(details: PerformanceDetails, seat_map: Option<SeatMap>) -> Self {
        PerformanceResponse {
            id: details.id,
            show_time: details.show_time,
            play: details.play,
            theatre_hall: details.theatre_hall.into(),
            seat_map,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatePerformanceRequest {
    play_id: i64,
    theatre_hall_id: i64,
    show_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ReschedulePerformanceRequest {
    show_time: DateTime<Utc>,
}

async fn load(state: &AppState, id: i64) -> Result<PerformanceDetails, ApiError> {
    state
        .store
        .get_performance(id)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", id))
}

// GET /api/performances?date_from=&date_to=&play=&hall=
async fn list_performances(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PerformanceFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let performances = state.store.list_performances(&filter).await?;
    let payload: Vec<PerformanceResponse> = performances
        .into_iter()
        .map(|p| PerformanceResponse::new(p, None))
        .collect();
    Ok(Json(payload))
}

// GET /api/performances/{id}
async fn get_performance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let details = load(&state, id).await?;
    let seat_map = state.seat_maps.for_performance(&details).await?;
    Ok(Json(PerformanceResponse::new(details, Some(seat_map))))
}

// GET /api/performances/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let details = load(&state, id).await?;
    Ok(Json(state.seat_maps.for_performance(&details).await?))
}

// POST /api/performances
async fn create_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<CreatePerformanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state
        .store
        .create_performance(NewPerformance {
            play_id: req.play_id,
            theatre_hall_id: req.theatre_hall_id,
            show_time: req.show_time,
        })
        .await?;
    tracing::info!(
        performance_id = performance.id,
        admin = %admin.username,
        "Performance scheduled"
    );
    let details = load(&state, performance.id).await?;
    Ok((StatusCode::CREATED, Json(PerformanceResponse::new(details, None))))
}

// PATCH /api/performances/{id}
async fn reschedule_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<ReschedulePerformanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.reschedule_performance(id, req.show_time).await?;
    let details = load(&state, id).await?;
    Ok(Json(PerformanceResponse::new(details, None)))
}

// DELETE /api/performances/{id}
async fn delete_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_performance(id).await?;
    tracing::info!(performance_id = id, admin = %admin.username, "Performance deleted");
    Ok(StatusCode::NO_CONTENT)
}
