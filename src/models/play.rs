use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Play {
    pub id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewPlay {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlayChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}
