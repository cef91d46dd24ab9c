use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use super::theatre_hall::HallDimensions;

/// Место вне сетки зала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeatError {
    #[error("row number must be in available range: (1, {max}), got {value}")]
    Row { value: i32, max: i32 },
    #[error("seat number must be in available range: (1, {max}), got {value}")]
    Seat { value: i32, max: i32 },
}

impl SeatError {
    pub fn field(&self) -> &'static str {
        match self {
            SeatError::Row { .. } => "row",
            SeatError::Seat { .. } => "seat",
        }
    }
}

/// Единственная проверка границ места. Её зовут и при разборе запроса,
/// и перед вставкой билета.
pub fn validate_seat(row: i32, seat: i32, rows: i32, seats_in_row: i32) -> Result<(), SeatError> {
    if !(1..=rows).contains(&row) {
        return Err(SeatError::Row { value: row, max: rows });
    }
    if !(1..=seats_in_row).contains(&seat) {
        return Err(SeatError::Seat { value: seat, max: seats_in_row });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub performance_id: i64,
    pub reservation_id: i64,
}

/// Билет до записи в базу.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewTicket {
    pub row: i32,
    pub seat: i32,
    pub performance_id: i64,
}

impl NewTicket {
    pub fn check(&self, hall: &HallDimensions) -> Result<(), SeatError> {
        validate_seat(self.row, self.seat, hall.rows, hall.seats_in_row)
    }
}

/// Занятое место в зале.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRow, Serialize, Deserialize)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn main_hall() -> HallDimensions {
        HallDimensions::new(10, 20)
    }

    #[test]
    fn seat_inside_hall_passes() {
        assert_eq!(validate_seat(5, 10, 10, 20), Ok(()));
        assert_eq!(validate_seat(1, 1, 10, 20), Ok(()));
        assert_eq!(validate_seat(10, 20, 10, 20), Ok(()));
    }

    #[test]
    fn row_past_last_row_fails() {
        let err = validate_seat(11, 10, 10, 20).unwrap_err();
        assert_eq!(err, SeatError::Row { value: 11, max: 10 });
        assert_eq!(err.field(), "row");
    }

    #[test]
    fn seat_past_row_end_fails() {
        let err = validate_seat(5, 21, 10, 20).unwrap_err();
        assert_eq!(err.field(), "seat");
        assert_eq!(err.to_string(), "seat number must be in available range: (1, 20), got 21");
    }

    #[test]
    fn zero_is_never_a_seat() {
        assert!(validate_seat(0, 1, 10, 20).is_err());
        assert!(validate_seat(1, 0, 10, 20).is_err());
    }

    #[test]
    fn model_guard_agrees_with_validator() {
        let ticket = NewTicket { row: 11, seat: 10, performance_id: 1 };
        assert_eq!(ticket.check(&main_hall()), validate_seat(11, 10, 10, 20));
    }

    proptest! {
        #[test]
        fn bounds_match_hall_grid(row in -5..40i32, seat in -5..40i32, rows in 1..30i32, seats in 1..30i32) {
            let inside = row >= 1 && row <= rows && seat >= 1 && seat <= seats;
            prop_assert_eq!(validate_seat(row, seat, rows, seats).is_ok(), inside);

            let ticket = NewTicket { row, seat, performance_id: 1 };
            prop_assert_eq!(
                ticket.check(&HallDimensions::new(rows, seats)),
                validate_seat(row, seat, rows, seats)
            );
        }
    }
}
