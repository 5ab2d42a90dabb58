pub mod booking;
pub mod service;
pub mod user;
pub mod vehicle;

pub use booking::{Booking, BookingStatus, BookingView, ServiceSummary, VehicleSummary};
pub use service::Service;
pub use user::{Profile, Role, User};
pub use vehicle::{Vehicle, VehicleType};
