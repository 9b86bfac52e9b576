use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::ReservationStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}", get(get_ticket))
}

async fn list_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_tickets(user.user_id).await?))
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state
        .store
        .get_ticket(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("ticket", id))?;
    Ok(Json(ticket))
}
