use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::place::GeoPoint;
use crate::models::vehicle::VehicleType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

/// Who is making a request, as resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub vehicle_type: Option<VehicleType>,
    pub vehicle_number: Option<String>,
    pub is_online: bool,
    pub location: Option<GeoPoint>,
    pub total_trips: u32,
    pub total_earnings: u64,
    #[serde(skip)]
    pub credited_bookings: HashSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            role,
            vehicle_type: None,
            vehicle_number: None,
            is_online: false,
            location: None,
            total_trips: 0,
            total_earnings: 0,
            credited_bookings: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn driver(
        name: impl Into<String>,
        phone: impl Into<String>,
        vehicle_type: VehicleType,
        vehicle_number: impl Into<String>,
    ) -> Self {
        let mut user = Self::new(name, phone, Role::Driver);
        user.vehicle_type = Some(vehicle_type);
        user.vehicle_number = Some(vehicle_number.into());
        user
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            role: self.role,
        }
    }
}
