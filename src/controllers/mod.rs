pub mod error;
pub mod extract;
pub mod halls;
pub mod me;
pub mod performances;
pub mod plays;
pub mod reservations;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

pub use error::ApiError;

// Catalog handlers are read-open and admin-only for writes;
// reservation and ticket handlers only ever see the caller's own records.
pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(halls::routes())
        .merge(plays::routes())
        .merge(performances::routes())
        .merge(reservations::routes())
        .merge(tickets::routes())
        .merge(me::routes())
}
