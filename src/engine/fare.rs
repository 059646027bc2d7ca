use serde::Serialize;

use crate::geo::{haversine_km, round_to_tenth};
use crate::models::place::GeoPoint;
use crate::models::vehicle::VehiclePricing;

const MINUTES_PER_KM: f64 = 3.0;
const HANDLING_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FareQuote {
    pub distance_km: f64,
    pub base_price: u32,
    pub distance_charge: u32,
    pub total_price: u32,
    pub estimated_time_minutes: u32,
}

pub fn quote(pickup: &GeoPoint, delivery: &GeoPoint, pricing: &VehiclePricing) -> FareQuote {
    let distance_km = round_to_tenth(haversine_km(pickup, delivery));
    let distance_charge = (distance_km * pricing.per_km_rate).round().max(0.0) as u32;
    let estimated_time_minutes = (distance_km * MINUTES_PER_KM + HANDLING_MINUTES).round() as u32;

    FareQuote {
        distance_km,
        base_price: pricing.base_fare,
        distance_charge,
        total_price: pricing.base_fare + distance_charge,
        estimated_time_minutes,
    }
}
