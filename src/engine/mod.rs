pub mod dispatch;
pub mod fare;
pub mod lifecycle;
pub mod otp;
pub mod presence;
pub mod sweeper;
