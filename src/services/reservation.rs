//! Создание брони: все билеты или ни одного.
//!
//! Порядок: проверка запроса -> границы мест по залу каждого показа ->
//! транзакция (занятые места, бронь, билеты) -> commit. Уникальность
//! (performance, row, seat) держит ограничение в базе, так что из двух
//! параллельных попыток на одно место проходит ровно одна. Билеты пишутся
//! в порядке (performance, row, seat), иначе встречные брони на одни и те же
//! места взаимно блокируются.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};
use validator::Validate;

use crate::database::{sqlstate, sqlstate_of};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{HallDimensions, NewTicket, Reservation, Ticket};
use crate::services::catalog::TicketView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub row: i32,
    pub seat: i32,
    pub performance: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, message = "this list may not be empty"))]
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationCreated {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketView>,
}

#[derive(Debug, Clone, Copy, FromRow)]
struct PerformanceHall {
    performance_id: i64,
    rows: i32,
    seats_in_row: i32,
}

fn ticket_field(index: usize, field: &str) -> String {
    format!("tickets[{index}].{field}")
}

/// Проверка билетов запроса без базы: показ существует, место в сетке зала,
/// внутри запроса нет повторов. Возвращает все ошибки сразу.
pub fn plan_tickets(
    tickets: &[TicketRequest],
    halls: &HashMap<i64, HallDimensions>,
) -> Result<Vec<NewTicket>, FieldErrors> {
    let mut errors = FieldErrors::default();
    let mut seen = HashSet::with_capacity(tickets.len());
    let mut planned = Vec::with_capacity(tickets.len());

    for (index, t) in tickets.iter().enumerate() {
        let Some(hall) = halls.get(&t.performance) else {
            errors.add(
                ticket_field(index, "performance"),
                format!("invalid pk \"{}\" - object does not exist", t.performance),
            );
            continue;
        };

        let ticket = NewTicket { row: t.row, seat: t.seat, performance_id: t.performance };
        if let Err(e) = ticket.check(hall) {
            errors.add(ticket_field(index, e.field()), e.to_string());
            continue;
        }

        if !seen.insert(ticket) {
            errors.add(
                ticket_field(index, "seat"),
                format!(
                    "seat (row {}, seat {}) for performance {} is requested more than once",
                    t.row, t.seat, t.performance
                ),
            );
            continue;
        }

        planned.push(ticket);
    }

    if errors.is_empty() {
        Ok(planned)
    } else {
        Err(errors)
    }
}

async fn load_halls(
    pool: &PgPool,
    tickets: &[TicketRequest],
) -> Result<HashMap<i64, HallDimensions>, sqlx::Error> {
    let ids: Vec<i64> = tickets
        .iter()
        .map(|t| t.performance)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = sqlx::query_as::<_, PerformanceHall>(
        "SELECT pf.id AS performance_id, h.rows, h.seats_in_row
         FROM performances pf
         JOIN theatre_halls h ON h.id = pf.theatre_hall_id
         WHERE pf.id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.performance_id, HallDimensions::new(r.rows, r.seats_in_row)))
        .collect())
}

/// Порядок записи билетов: индексы запроса, отсортированные по месту.
pub fn insertion_order(planned: &[NewTicket]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..planned.len()).collect();
    order.sort_by_key(|&i| {
        let t = &planned[i];
        (t.performance_id, t.row, t.seat)
    });
    order
}

fn taken_message(ticket: &NewTicket) -> String {
    format!(
        "seat (row {}, seat {}) is already taken for performance {}",
        ticket.row, ticket.seat, ticket.performance_id
    )
}

fn seat_taken(index: usize, ticket: &NewTicket) -> FieldErrors {
    FieldErrors::single(ticket_field(index, "seat"), taken_message(ticket))
}

async fn reject_taken_seats(
    tx: &mut Transaction<'_, Postgres>,
    planned: &[NewTicket],
) -> AppResult<()> {
    let performance_ids: Vec<i64> = planned.iter().map(|t| t.performance_id).collect();
    let rows: Vec<i32> = planned.iter().map(|t| t.row).collect();
    let seats: Vec<i32> = planned.iter().map(|t| t.seat).collect();

    let taken: Vec<(i64, i32, i32)> = sqlx::query_as(
        r#"
        SELECT t.performance_id, t.row, t.seat
        FROM tickets t
        JOIN UNNEST($1::BIGINT[], $2::INT[], $3::INT[]) AS req(performance_id, row, seat)
          ON t.performance_id = req.performance_id AND t.row = req.row AND t.seat = req.seat
        "#,
    )
    .bind(&performance_ids)
    .bind(&rows)
    .bind(&seats)
    .fetch_all(&mut **tx)
    .await?;

    if taken.is_empty() {
        return Ok(());
    }

    let taken: HashSet<(i64, i32, i32)> = taken.into_iter().collect();
    let mut errors = FieldErrors::default();
    for (index, t) in planned.iter().enumerate() {
        if taken.contains(&(t.performance_id, t.row, t.seat)) {
            errors.add(ticket_field(index, "seat"), taken_message(t));
        }
    }
    Err(AppError::Validation(errors))
}

async fn insert_ticket(
    tx: &mut Transaction<'_, Postgres>,
    index: usize,
    ticket: &NewTicket,
    hall: &HallDimensions,
    reservation_id: i64,
) -> AppResult<Ticket> {
    // Повторная проверка на уровне модели перед записью
    ticket
        .check(hall)
        .map_err(|e| AppError::validation(ticket_field(index, e.field()), e.to_string()))?;

    sqlx::query_as::<_, Ticket>(
        "INSERT INTO tickets (row, seat, performance_id, reservation_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id, row, seat, performance_id, reservation_id",
    )
    .bind(ticket.row)
    .bind(ticket.seat)
    .bind(ticket.performance_id)
    .bind(reservation_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match sqlstate_of(&e).as_deref() {
        // Параллельная транзакция успела занять место
        Some(sqlstate::UNIQUE_VIOLATION | sqlstate::DEADLOCK_DETECTED) => {
            AppError::Validation(seat_taken(index, ticket))
        }
        Some(sqlstate::FOREIGN_KEY_VIOLATION) => AppError::validation(
            ticket_field(index, "performance"),
            format!("invalid pk \"{}\" - object does not exist", ticket.performance_id),
        ),
        _ => AppError::Database(e),
    })
}

pub async fn create_reservation(
    pool: &PgPool,
    user_id: i64,
    user_label: &str,
    request: &CreateReservationRequest,
) -> AppResult<ReservationCreated> {
    // Пустой список отсекается до любого обращения к базе
    request
        .validate()
        .map_err(|e| AppError::Validation(e.into()))?;

    let halls = load_halls(pool, &request.tickets).await?;
    let planned = plan_tickets(&request.tickets, &halls).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    reject_taken_seats(&mut tx, &planned).await?;

    let reservation = sqlx::query_as::<_, Reservation>(
        "INSERT INTO reservations (user_id) VALUES ($1)
         RETURNING id, user_id, created_at",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut tickets = Vec::with_capacity(planned.len());
    for index in insertion_order(&planned) {
        let ticket = &planned[index];
        let hall = halls.get(&ticket.performance_id).ok_or_else(|| {
            AppError::Internal(format!("hall for performance {} vanished", ticket.performance_id))
        })?;
        match insert_ticket(&mut tx, index, ticket, hall, reservation.id).await {
            Ok(t) => tickets.push((index, t)),
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!("reservation rollback failed: {:?}", rb);
                }
                return Err(e);
            }
        }
    }

    tx.commit().await?;

    // Ответ в порядке запроса
    tickets.sort_by_key(|(index, _)| *index);

    info!(
        "{} with {} ticket(s)",
        reservation.describe(user_label),
        tickets.len()
    );

    Ok(ReservationCreated {
        id: reservation.id,
        created_at: reservation.created_at,
        tickets: tickets
            .into_iter()
            .map(|(_, t)| TicketView {
                id: t.id,
                row: t.row,
                seat: t.seat,
                performance: t.performance_id,
            })
            .collect(),
    })
}
