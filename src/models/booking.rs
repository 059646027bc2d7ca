use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Identity;

use crate::models::place::Place;
use crate::models::vehicle::VehicleType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Forward edges of the booking state machine.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Accepted)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Accepted, BookingStatus::InProgress)
                | (BookingStatus::Accepted, BookingStatus::Cancelled)
                | (BookingStatus::InProgress, BookingStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub driver_vehicle_number: Option<String>,
    pub pickup: Place,
    pub delivery: Place,
    pub vehicle_type: VehicleType,
    pub distance_km: f64,
    pub base_price: u32,
    pub distance_charge: u32,
    pub total_price: u32,
    pub estimated_time_minutes: u32,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    /// Trip-start code. Never serialized with the booking; only the
    /// customer receives it, through [`BookingView`].
    #[serde(skip_serializing, default)]
    pub otp: String,
    pub rating: Option<u8>,
    pub rating_comment: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }
}

/// A booking as returned to one caller. The trip-start code is attached
/// only when the caller is the booking's customer.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl BookingView {
    pub fn for_caller(booking: Booking, caller: Identity) -> Self {
        let otp = (booking.customer_id == caller.user_id).then(|| booking.otp.clone());
        Self { booking, otp }
    }
}
