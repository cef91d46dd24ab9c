//! Чтение каталога: списки и карточки спектаклей, показов и броней.
//!
//! Производные значения (`capacity`, `available_tickets`, `full_name`) считаются
//! при чтении из загруженных строк и нигде не хранятся.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::actor::ActorResponse;
use crate::models::theatre_hall::TheatreHallResponse;
use crate::models::{Actor, Genre, HallDimensions, Play, TakenPlace, TheatreHall};

/* ---------- фильтры ---------- */

/// `"1, 2,3"` -> `[1, 2, 3]`. Любой мусор - ошибка по имени параметра.
pub fn parse_ids(param: &str, raw: &str) -> AppResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .map(|part| {
            part.parse::<i64>().map_err(|_| {
                AppError::validation(param, format!("expected comma-separated integer ids, got {part:?}"))
            })
        })
        .collect()
}

pub fn parse_date(param: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(param, format!("expected an ISO date (YYYY-MM-DD), got {raw:?}")))
}

/// Фильтр списка спектаклей: ИЛИ внутри измерения, И между измерениями.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayFilter {
    pub genres: Option<Vec<i64>>,
    pub actors: Option<Vec<i64>>,
}

impl PlayFilter {
    /// Пустой параметр (`?genres=`) означает отсутствие фильтра.
    pub fn from_query(genres: Option<&str>, actors: Option<&str>) -> AppResult<Self> {
        let parse = |param: &str, raw: Option<&str>| -> AppResult<Option<Vec<i64>>> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                Some(raw) => parse_ids(param, raw).map(Some),
                None => Ok(None),
            }
        };
        Ok(PlayFilter {
            genres: parse("genres", genres)?,
            actors: parse("actors", actors)?,
        })
    }
}

/* ---------- спектакли ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorResponse>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayGenreRow {
    pub play_id: i64,
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayActorRow {
    pub play_id: i64,
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

struct PlayRelations {
    genres: HashMap<i64, Vec<Genre>>,
    actors: HashMap<i64, Vec<Actor>>,
}

impl PlayRelations {
    fn group(genre_rows: Vec<PlayGenreRow>, actor_rows: Vec<PlayActorRow>) -> Self {
        let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
        for row in genre_rows {
            genres.entry(row.play_id).or_default().push(Genre { id: row.id, name: row.name });
        }
        let mut actors: HashMap<i64, Vec<Actor>> = HashMap::new();
        for row in actor_rows {
            actors.entry(row.play_id).or_default().push(Actor {
                id: row.id,
                first_name: row.first_name,
                last_name: row.last_name,
            });
        }
        Self { genres, actors }
    }
}

/// Списочное представление: жанры и актёры строками.
pub fn assemble_play_list(
    plays: Vec<Play>,
    genre_rows: Vec<PlayGenreRow>,
    actor_rows: Vec<PlayActorRow>,
) -> Vec<PlayListItem> {
    let mut relations = PlayRelations::group(genre_rows, actor_rows);
    plays
        .into_iter()
        .map(|play| PlayListItem {
            genres: relations
                .genres
                .remove(&play.id)
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
            actors: relations
                .actors
                .remove(&play.id)
                .unwrap_or_default()
                .iter()
                .map(Actor::full_name)
                .collect(),
            id: play.id,
            title: play.title,
            description: play.description,
            cover_image: play.cover_image,
        })
        .collect()
}

pub fn assemble_play_detail(
    play: Play,
    genre_rows: Vec<PlayGenreRow>,
    actor_rows: Vec<PlayActorRow>,
) -> PlayDetail {
    let mut relations = PlayRelations::group(genre_rows, actor_rows);
    PlayDetail {
        genres: relations.genres.remove(&play.id).unwrap_or_default(),
        actors: relations
            .actors
            .remove(&play.id)
            .unwrap_or_default()
            .into_iter()
            .map(ActorResponse::from)
            .collect(),
        id: play.id,
        title: play.title,
        description: play.description,
        cover_image: play.cover_image,
    }
}

async fn load_relations(
    pool: &PgPool,
    play_ids: &[i64],
) -> Result<(Vec<PlayGenreRow>, Vec<PlayActorRow>), sqlx::Error> {
    let genres = sqlx::query_as::<_, PlayGenreRow>(
        "SELECT pg.play_id, g.id, g.name
         FROM play_genres pg
         JOIN genres g ON g.id = pg.genre_id
         WHERE pg.play_id = ANY($1)
         ORDER BY g.name",
    )
    .bind(play_ids)
    .fetch_all(pool)
    .await?;

    let actors = sqlx::query_as::<_, PlayActorRow>(
        "SELECT pa.play_id, a.id, a.first_name, a.last_name
         FROM play_actors pa
         JOIN actors a ON a.id = pa.actor_id
         WHERE pa.play_id = ANY($1)
         ORDER BY a.last_name, a.first_name",
    )
    .bind(play_ids)
    .fetch_all(pool)
    .await?;

    Ok((genres, actors))
}

pub async fn list_plays(pool: &PgPool, filter: &PlayFilter) -> AppResult<Vec<PlayListItem>> {
    let plays = sqlx::query_as::<_, Play>(
        r#"
        SELECT p.id, p.title, p.description, p.cover_image
        FROM plays p
        WHERE ($1::BIGINT[] IS NULL OR EXISTS (
                  SELECT 1 FROM play_genres pg
                  WHERE pg.play_id = p.id AND pg.genre_id = ANY($1)))
          AND ($2::BIGINT[] IS NULL OR EXISTS (
                  SELECT 1 FROM play_actors pa
                  WHERE pa.play_id = p.id AND pa.actor_id = ANY($2)))
        ORDER BY p.id
        "#,
    )
    .bind(filter.genres.as_deref())
    .bind(filter.actors.as_deref())
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = plays.iter().map(|p| p.id).collect();
    let (genres, actors) = load_relations(pool, &ids).await?;
    Ok(assemble_play_list(plays, genres, actors))
}

pub async fn play_detail(pool: &PgPool, id: i64) -> AppResult<PlayDetail> {
    let play = Play::find(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("play", id))?;
    let (genres, actors) = load_relations(pool, &[id]).await?;
    Ok(assemble_play_detail(play, genres, actors))
}

/* ---------- показы ---------- */

#[derive(Debug, Clone, FromRow)]
pub struct PerformanceRow {
    pub id: i64,
    pub play_id: i64,
    pub theatre_hall_id: i64,
    pub show_time: NaiveDateTime,
    pub play_title: String,
    pub play_image: Option<String>,
    pub theatre_hall_name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub tickets_taken: i64,
}

impl PerformanceRow {
    pub fn dimensions(&self) -> HallDimensions {
        HallDimensions::new(self.rows, self.seats_in_row)
    }

    pub fn available_tickets(&self) -> i64 {
        self.dimensions().available(self.tickets_taken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceListItem {
    pub id: i64,
    pub play_title: String,
    pub play_image: Option<String>,
    pub theatre_hall_name: String,
    pub theatre_hall_capacity: i64,
    pub show_time: NaiveDateTime,
    pub available_tickets: i64,
}

impl From<PerformanceRow> for PerformanceListItem {
    fn from(row: PerformanceRow) -> Self {
        PerformanceListItem {
            theatre_hall_capacity: row.dimensions().capacity(),
            available_tickets: row.available_tickets(),
            id: row.id,
            play_title: row.play_title,
            play_image: row.play_image,
            theatre_hall_name: row.theatre_hall_name,
            show_time: row.show_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceDetail {
    pub id: i64,
    pub play: PlayListItem,
    pub theatre_hall: TheatreHallResponse,
    pub show_time: NaiveDateTime,
    pub taken_places: Vec<TakenPlace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableTickets {
    pub performance_id: i64,
    pub available_tickets: i64,
}

const PERFORMANCE_SELECT: &str = r#"
    SELECT pf.id, pf.play_id, pf.theatre_hall_id, pf.show_time,
           p.title AS play_title, p.cover_image AS play_image,
           h.name AS theatre_hall_name, h.rows, h.seats_in_row,
           (SELECT COUNT(*) FROM tickets t WHERE t.performance_id = pf.id) AS tickets_taken
    FROM performances pf
    JOIN plays p ON p.id = pf.play_id
    JOIN theatre_halls h ON h.id = pf.theatre_hall_id
"#;

/// Показы, опционально за один календарный день (`show_time` без часового пояса).
pub async fn list_performances(
    pool: &PgPool,
    date: Option<NaiveDate>,
) -> AppResult<Vec<PerformanceListItem>> {
    let rows = sqlx::query_as::<_, PerformanceRow>(&format!(
        "{PERFORMANCE_SELECT}
         WHERE ($1::DATE IS NULL OR pf.show_time::DATE = $1)
         ORDER BY pf.show_time, pf.id"
    ))
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PerformanceListItem::from).collect())
}

async fn find_performance(pool: &PgPool, id: i64) -> AppResult<PerformanceRow> {
    sqlx::query_as::<_, PerformanceRow>(&format!("{PERFORMANCE_SELECT} WHERE pf.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("performance", id))
}

pub async fn performance_detail(pool: &PgPool, id: i64) -> AppResult<PerformanceDetail> {
    let row = find_performance(pool, id).await?;

    let play = Play::find(pool, row.play_id)
        .await?
        .ok_or_else(|| AppError::not_found("play", row.play_id))?;
    let (genres, actors) = load_relations(pool, &[play.id]).await?;
    let play = assemble_play_list(vec![play], genres, actors)
        .pop()
        .ok_or_else(|| AppError::Internal("play projection came back empty".to_string()))?;

    let hall = TheatreHall {
        id: row.theatre_hall_id,
        name: row.theatre_hall_name.clone(),
        rows: row.rows,
        seats_in_row: row.seats_in_row,
    };

    let taken_places = sqlx::query_as::<_, TakenPlace>(
        "SELECT row, seat FROM tickets WHERE performance_id = $1 ORDER BY row, seat",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(PerformanceDetail {
        id: row.id,
        play,
        theatre_hall: hall.into(),
        show_time: row.show_time,
        taken_places,
    })
}

/// Всегда из базы, без кеша.
pub async fn available_tickets(pool: &PgPool, id: i64) -> AppResult<AvailableTickets> {
    let row = find_performance(pool, id).await?;
    Ok(AvailableTickets {
        performance_id: row.id,
        available_tickets: row.available_tickets(),
    })
}

/* ---------- брони пользователя ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketView {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub performance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationView {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketView>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReservationTicketRow {
    pub reservation_id: i64,
    pub created_at: DateTime<Utc>,
    pub ticket_id: Option<i64>,
    pub row: Option<i32>,
    pub seat: Option<i32>,
    pub performance_id: Option<i64>,
}

/// Строки JOIN-а в брони с билетами; порядок строк сохраняется.
pub fn group_reservations(rows: Vec<ReservationTicketRow>) -> Vec<ReservationView> {
    let mut out: Vec<ReservationView> = Vec::new();
    for r in rows {
        if out.last().map(|v| v.id) != Some(r.reservation_id) {
            out.push(ReservationView {
                id: r.reservation_id,
                created_at: r.created_at,
                tickets: Vec::new(),
            });
        }
        if let (Some(id), Some(row), Some(seat), Some(performance), Some(view)) =
            (r.ticket_id, r.row, r.seat, r.performance_id, out.last_mut())
        {
            view.tickets.push(TicketView { id, row, seat, performance });
        }
    }
    out
}

pub async fn list_reservations(pool: &PgPool, user_id: i64) -> AppResult<Vec<ReservationView>> {
    let rows = sqlx::query_as::<_, ReservationTicketRow>(
        r#"
        SELECT r.id AS reservation_id, r.created_at,
               t.id AS ticket_id, t.row, t.seat, t.performance_id
        FROM reservations r
        LEFT JOIN tickets t ON t.reservation_id = r.id
        WHERE r.user_id = $1
        ORDER BY r.created_at DESC, r.id DESC, t.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(group_reservations(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn play(id: i64, title: &str) -> Play {
        Play {
            id,
            title: title.into(),
            description: String::new(),
            cover_image: None,
        }
    }

    #[test]
    fn parse_ids_accepts_spaces() {
        assert_eq!(parse_ids("genres", "1, 2,3").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_ids_names_the_bad_parameter() {
        match parse_ids("actors", "1,x") {
            Err(AppError::Validation(errors)) => assert!(errors.get("actors").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_filters_mean_no_filter() {
        assert_eq!(PlayFilter::from_query(Some(""), None).unwrap(), PlayFilter::default());
        let filter = PlayFilter::from_query(Some("1,2"), Some("5")).unwrap();
        assert_eq!(filter.genres, Some(vec![1, 2]));
        assert_eq!(filter.actors, Some(vec![5]));
    }

    #[test]
    fn parse_date_rejects_non_iso() {
        assert_eq!(
            parse_date("date", "2025-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert!(parse_date("date", "01/01/2025").is_err());
    }

    #[test]
    fn play_list_flattens_relations_to_names() {
        let items = assemble_play_list(
            vec![play(1, "Hamlet"), play(2, "Cats")],
            vec![
                PlayGenreRow { play_id: 1, id: 10, name: "Drama".into() },
                PlayGenreRow { play_id: 1, id: 11, name: "Tragedy".into() },
            ],
            vec![PlayActorRow {
                play_id: 1,
                id: 5,
                first_name: "John".into(),
                last_name: "Doe".into(),
            }],
        );
        assert_eq!(items[0].genres, vec!["Drama", "Tragedy"]);
        assert_eq!(items[0].actors, vec!["John Doe"]);
        assert!(items[1].genres.is_empty());
        assert!(items[1].actors.is_empty());
    }

    #[test]
    fn play_detail_nests_full_objects() {
        let detail = assemble_play_detail(
            play(1, "Hamlet"),
            vec![PlayGenreRow { play_id: 1, id: 10, name: "Drama".into() }],
            vec![PlayActorRow {
                play_id: 1,
                id: 5,
                first_name: "John".into(),
                last_name: "Doe".into(),
            }],
        );
        assert_eq!(detail.genres, vec![Genre { id: 10, name: "Drama".into() }]);
        assert_eq!(detail.actors[0].full_name, "John Doe");
    }

    #[test]
    fn performance_item_computes_availability() {
        let row = PerformanceRow {
            id: 1,
            play_id: 1,
            theatre_hall_id: 1,
            show_time: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            play_title: "Hamlet".into(),
            play_image: None,
            theatre_hall_name: "Main Hall".into(),
            rows: 10,
            seats_in_row: 20,
            tickets_taken: 3,
        };
        let item = PerformanceListItem::from(row);
        assert_eq!(item.theatre_hall_capacity, 200);
        assert_eq!(item.available_tickets, 197);
    }

    #[test]
    fn reservations_group_in_row_order() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let row = |rid, tid: Option<i64>| ReservationTicketRow {
            reservation_id: rid,
            created_at: at,
            ticket_id: tid,
            row: tid.map(|_| 1),
            seat: tid.map(|t| t as i32),
            performance_id: tid.map(|_| 7),
        };
        let views = group_reservations(vec![row(9, Some(1)), row(9, Some(2)), row(4, None)]);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 9);
        assert_eq!(views[0].tickets.len(), 2);
        assert!(views[1].tickets.is_empty());
    }
}
