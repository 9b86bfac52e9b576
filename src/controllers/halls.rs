use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::error::ApiError;
use super::extract::AppJson;
use crate::middleware::AdminUser;
use crate::models::{NewHall, TheatreHall};
use crate::store::HallStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/halls", get(list_halls).post(create_hall))
        .route("/halls/{id}", get(get_hall).patch(rename_hall).delete(delete_hall))
}

#[derive(Debug, Serialize)]
pub struct HallResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<TheatreHall> for HallResponse {
    fn from(hall: TheatreHall) -> Self {
        let capacity = hall.capacity();
        HallResponse {
            id: hall.id,
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CreateHallRequest {
    #[validate(length(min = 1, max = 64))]
    name: String,
    #[validate(range(min = 1))]
    rows: i32,
    #[validate(range(min = 1))]
    seats_in_row: i32,
}

#[derive(Debug, Deserialize, Validate)]
struct RenameHallRequest {
    #[validate(length(min = 1, max = 64))]
    name: String,
}

// GET /api/halls
async fn list_halls(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let halls = state.store.list_halls().await?;
    Ok(Json(halls.into_iter().map(HallResponse::from).collect::<Vec<_>>()))
}

// GET /api/halls/{id}
async fn get_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let hall = state
        .store
        .get_hall(id)
        .await?
        .ok_or_else(|| ApiError::not_found("hall", id))?;
    Ok(Json(HallResponse::from(hall)))
}

// POST /api/halls
async fn create_hall(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<CreateHallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let hall = state
        .store
        .create_hall(NewHall {
            name: req.name,
            rows: req.rows,
            seats_in_row: req.seats_in_row,
        })
        .await?;
    tracing::info!(hall_id = hall.id, admin = %admin.username, "Hall created");
    Ok((StatusCode::CREATED, Json(HallResponse::from(hall))))
}

// PATCH /api/halls/{id}
async fn rename_hall(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<RenameHallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let hall = state.store.rename_hall(id, req.name).await?;
    Ok(Json(HallResponse::from(hall)))
}

// DELETE /api/halls/{id}
async fn delete_hall(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_hall(id).await?;
    tracing::info!(hall_id = id, admin = %admin.username, "Hall deleted");
    Ok(StatusCode::NO_CONTENT)
}
