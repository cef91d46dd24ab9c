pub mod actor;
pub mod genre;
pub mod performance;
pub mod play;
pub mod reservation;
pub mod theatre_hall;
pub mod ticket;
pub mod user;

pub use actor::{Actor, NewActor};
pub use genre::{Genre, NewGenre};
pub use performance::{NewPerformance, Performance};
pub use play::{NewPlay, Play};
pub use reservation::Reservation;
pub use theatre_hall::{HallDimensions, NewTheatreHall, TheatreHall};
pub use ticket::{validate_seat, NewTicket, SeatError, TakenPlace, Ticket};
pub use user::User;
