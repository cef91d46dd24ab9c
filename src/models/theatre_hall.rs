use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TheatreHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

/// Сетка зала: всё, что нужно для проверки мест и подсчёта вместимости.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct HallDimensions {
    pub rows: i32,
    pub seats_in_row: i32,
}

impl HallDimensions {
    pub fn new(rows: i32, seats_in_row: i32) -> Self {
        Self { rows, seats_in_row }
    }

    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }

    /// Свободные места при `taken` проданных билетах.
    pub fn available(&self, taken: i64) -> i64 {
        self.capacity() - taken
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.rows <= 0 {
            errors.add("rows", "rows must be a positive integer");
        }
        if self.seats_in_row <= 0 {
            errors.add("seats_in_row", "seats_in_row must be a positive integer");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTheatreHall {
    #[validate(length(min = 1, max = 255, message = "name must be 1..255 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "rows must be a positive integer"))]
    pub rows: i32,
    #[validate(range(min = 1, message = "seats_in_row must be a positive integer"))]
    pub seats_in_row: i32,
}

impl TheatreHall {
    pub fn dimensions(&self) -> HallDimensions {
        HallDimensions::new(self.rows, self.seats_in_row)
    }

    pub fn capacity(&self) -> i64 {
        self.dimensions().capacity()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<TheatreHall>, sqlx::Error> {
        sqlx::query_as::<_, TheatreHall>(
            "SELECT id, name, rows, seats_in_row FROM theatre_halls ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn insert(pool: &PgPool, new: &NewTheatreHall) -> AppResult<TheatreHall> {
        // Модельная проверка до записи, независимо от того, кто вызвал
        HallDimensions::new(new.rows, new.seats_in_row)
            .validate()
            .map_err(AppError::Validation)?;

        let hall = sqlx::query_as::<_, TheatreHall>(
            "INSERT INTO theatre_halls (name, rows, seats_in_row) VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(new.name.trim())
        .bind(new.rows)
        .bind(new.seats_in_row)
        .fetch_one(pool)
        .await?;
        Ok(hall)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TheatreHallResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<TheatreHall> for TheatreHallResponse {
    fn from(hall: TheatreHall) -> Self {
        let capacity = hall.capacity();
        TheatreHallResponse {
            id: hall.id,
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity,
        }
    }
}
