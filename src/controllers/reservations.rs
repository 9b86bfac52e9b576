use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use super::extract::AppJson;
use crate::geometry::RequestedSeat;
use crate::middleware::AuthUser;
use crate::store::{PerformanceStore, ReservationStore};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route("/reservations/{id}", get(get_reservation).delete(cancel_reservation))
}

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    performance_id: i64,
    seats: Vec<RequestedSeat>,
}

// POST /api/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state
        .store
        .get_performance(req.performance_id)
        .await?
        .ok_or_else(|| ApiError::not_found("performance", req.performance_id))?;

    let reservation = state
        .booking
        .create_reservation(user.user_id, &performance, &req.seats)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

// GET /api/reservations
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_reservations(user.user_id).await?))
}

// GET /api/reservations/{id}
async fn get_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = state
        .store
        .get_reservation(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("reservation", id))?;
    Ok(Json(reservation))
}

// DELETE /api/reservations/{id}
async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.booking.cancel_reservation(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
