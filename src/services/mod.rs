pub mod booking;
pub mod seat_map;
pub mod seed;

pub use booking::{BookingError, BookingService};
pub use seat_map::{SeatMap, SeatMapService, SeatState};
pub use seed::SeedService;
