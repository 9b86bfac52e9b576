pub mod user;
pub mod hall;
pub mod play;
pub mod performance;
pub mod reservation;

pub use user::{NewUser, User};
pub use hall::{NewHall, TheatreHall};
pub use play::{NewPlay, Play, PlayChanges};
pub use performance::{NewPerformance, Performance, PerformanceDetails, PerformanceFilter};
pub use reservation::{Reservation, Ticket};
