pub mod bookings;
pub mod sessions;
pub mod users;
pub mod vehicles;
