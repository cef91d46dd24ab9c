use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    #[serde(rename = "play")]
    pub play_id: i64,
    #[serde(rename = "theatre_hall")]
    pub theatre_hall_id: i64,
    pub show_time: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPerformance {
    pub play: i64,
    pub theatre_hall: i64,
    pub show_time: NaiveDateTime,
}

/// `"Hamlet in Main Hall (2025-01-01 20:00)"`
pub fn describe(play_title: &str, hall_name: &str, show_time: NaiveDateTime) -> String {
    format!("{play_title} in {hall_name} ({})", show_time.format("%Y-%m-%d %H:%M"))
}

impl Performance {
    pub async fn insert(pool: &PgPool, new: &NewPerformance) -> AppResult<(Performance, String)> {
        let play_title: Option<String> = sqlx::query_scalar("SELECT title FROM plays WHERE id = $1")
            .bind(new.play)
            .fetch_optional(pool)
            .await?;
        let hall_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM theatre_halls WHERE id = $1")
                .bind(new.theatre_hall)
                .fetch_optional(pool)
                .await?;

        let (play_title, hall_name) = match (play_title, hall_name) {
            (Some(p), Some(h)) => (p, h),
            (p, h) => {
                let mut errors = FieldErrors::default();
                if p.is_none() {
                    errors.add("play", format!("invalid pk \"{}\" - object does not exist", new.play));
                }
                if h.is_none() {
                    errors.add(
                        "theatre_hall",
                        format!("invalid pk \"{}\" - object does not exist", new.theatre_hall),
                    );
                }
                return Err(AppError::Validation(errors));
            }
        };

        let performance = sqlx::query_as::<_, Performance>(
            "INSERT INTO performances (play_id, theatre_hall_id, show_time) VALUES ($1, $2, $3)
             RETURNING id, play_id, theatre_hall_id, show_time",
        )
        .bind(new.play)
        .bind(new.theatre_hall)
        .bind(new.show_time)
        .fetch_one(pool)
        .await?;

        let label = describe(&play_title, &hall_name, performance.show_time);
        Ok((performance, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn performance_label_has_title_hall_and_time() {
        let show_time = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        assert_eq!(
            describe("Hamlet", "Main Hall", show_time),
            "Hamlet in Main Hall (2025-01-01 20:00)"
        );
    }

    #[test]
    fn new_performance_parses_iso_show_time() {
        let new: NewPerformance = serde_json::from_str(
            r#"{"play": 1, "theatre_hall": 2, "show_time": "2025-01-01T20:00:00"}"#,
        )
        .unwrap();
        assert_eq!(new.show_time.format("%H:%M").to_string(), "20:00");
    }

    #[test]
    fn performance_serializes_relations_by_id() {
        let show_time = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let value = serde_json::to_value(Performance {
            id: 3,
            play_id: 1,
            theatre_hall_id: 2,
            show_time,
        })
        .unwrap();
        assert_eq!(value["play"], 1);
        assert_eq!(value["theatre_hall"], 2);
    }
}
