use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// `"Reservation by alice@example.com on 2025-01-01 20:00"`
    pub fn describe(&self, user: &str) -> String {
        format!("Reservation by {user} on {}", self.created_at.format("%Y-%m-%d %H:%M"))
    }
}
