use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::booking::Booking;

/// Events pushed to real-time subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "booking:new")]
    BookingNew(Box<Booking>),

    #[serde(rename = "booking:updated")]
    BookingUpdated(Box<Booking>),

    #[serde(rename = "driver:location:update")]
    DriverLocation { driver_id: Uuid, lat: f64, lng: f64 },

    #[serde(rename = "driver:status")]
    DriverStatus { driver_id: Uuid, is_online: bool },
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::BookingNew(_) => "booking:new",
            RealtimeEvent::BookingUpdated(_) => "booking:updated",
            RealtimeEvent::DriverLocation { .. } => "driver:location:update",
            RealtimeEvent::DriverStatus { .. } => "driver:status",
        }
    }
}
