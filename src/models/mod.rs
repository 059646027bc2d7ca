pub mod booking;
pub mod event;
pub mod otp;
pub mod place;
pub mod user;
pub mod vehicle;
