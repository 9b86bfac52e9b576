use axum::{routing::get, Json, Router};
use std::sync::Arc;

use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

async fn me(user: AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": user.user_id,
        "username": user.username,
        "is_admin": user.is_admin,
    }))
}
