use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use validator::Validate;

use crate::database::{sqlstate, sqlstate_of};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGenre {
    #[validate(length(min = 1, max = 255, message = "name must be 1..255 characters"))]
    pub name: String,
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Genre {
    pub async fn list(pool: &PgPool) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(pool)
            .await
    }

    pub async fn insert(pool: &PgPool, new: &NewGenre) -> AppResult<Genre> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "name must not be blank"));
        }

        sqlx::query_as::<_, Genre>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(pool)
            .await
            .map_err(|e| match sqlstate_of(&e).as_deref() {
                Some(sqlstate::UNIQUE_VIOLATION) => {
                    AppError::validation("name", "genre with this name already exists")
                }
                _ => AppError::Database(e),
            })
    }
}
