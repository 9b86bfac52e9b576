use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::error::ApiError;
use super::extract::AppJson;
use crate::middleware::AdminUser;
use crate::models::{NewPlay, PlayChanges};
use crate::store::PlayStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plays", get(list_plays).post(create_play))
        .route("/plays/{id}", get(get_play).patch(update_play).delete(delete_play))
}

#[derive(Debug, Deserialize, Validate)]
struct CreatePlayRequest {
    #[validate(length(min = 1, max = 128))]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdatePlayRequest {
    #[validate(length(min = 1, max = 128))]
    title: Option<String>,
    description: Option<String>,
}

async fn list_plays(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_plays().await?))
}

async fn get_play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let play = state
        .store
        .get_play(id)
        .await?
        .ok_or_else(|| ApiError::not_found("play", id))?;
    Ok(Json(play))
}

async fn create_play(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    AppJson(req): AppJson<CreatePlayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let play = state
        .store
        .create_play(NewPlay {
            title: req.title,
            description: req.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(play)))
}

async fn update_play(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdatePlayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let play = state
        .store
        .update_play(
            id,
            PlayChanges {
                title: req.title,
                description: req.description,
            },
        )
        .await?;
    Ok(Json(play))
}

async fn delete_play(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_play(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
