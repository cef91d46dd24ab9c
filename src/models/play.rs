use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use std::fmt;
use validator::Validate;

use crate::error::{AppError, AppResult, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Play {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPlay {
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

/// Ответ на создание: связи отдаются идентификаторами.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl Play {
    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Play>, sqlx::Error> {
        sqlx::query_as::<_, Play>(
            "SELECT id, title, description, cover_image FROM plays WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Спектакль вместе со связями жанров и актёров, одной транзакцией.
    pub async fn insert(pool: &PgPool, new: &NewPlay) -> AppResult<PlayResponse> {
        let genres: Vec<i64> = new.genres.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let actors: Vec<i64> = new.actors.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let mut tx = pool.begin().await?;

        let mut errors = FieldErrors::default();
        for id in missing_ids(&mut tx, "genres", &genres).await? {
            errors.add("genres", format!("invalid pk \"{id}\" - object does not exist"));
        }
        for id in missing_ids(&mut tx, "actors", &actors).await? {
            errors.add("actors", format!("invalid pk \"{id}\" - object does not exist"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let play = sqlx::query_as::<_, Play>(
            "INSERT INTO plays (title, description) VALUES ($1, $2)
             RETURNING id, title, description, cover_image",
        )
        .bind(new.title.trim())
        .bind(&new.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO play_genres (play_id, genre_id) SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(play.id)
        .bind(&genres)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO play_actors (play_id, actor_id) SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(play.id)
        .bind(&actors)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PlayResponse {
            id: play.id,
            title: play.title,
            description: play.description,
            genres,
            actors,
        })
    }

    pub async fn set_cover_image(pool: &PgPool, id: i64, cover_image: &str) -> Result<bool, sqlx::Error> {
        sqlx::query("UPDATE plays SET cover_image = $1 WHERE id = $2")
            .bind(cover_image)
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}

// table приходит только из кода выше, не из запроса
async fn missing_ids(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found: Vec<i64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
    let found: BTreeSet<i64> = found.into_iter().collect();
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}
