use dashmap::DashMap;

use crate::error::AppError;
use crate::models::vehicle::{VehiclePricing, VehicleType};

/// Vehicle pricing catalog. The engine only reads it.
#[derive(Default)]
pub struct VehicleCatalog {
    entries: DashMap<VehicleType, VehiclePricing>,
}

impl VehicleCatalog {
    pub fn with_defaults() -> Self {
        let catalog = Self::default();
        for pricing in default_pricing() {
            catalog.entries.insert(pricing.vehicle_type, pricing);
        }
        catalog
    }

    pub fn get(&self, vehicle_type: VehicleType) -> Option<VehiclePricing> {
        self.entries.get(&vehicle_type).map(|entry| entry.value().clone())
    }

    /// Pricing for `vehicle_type` if it exists and is active.
    pub fn active(&self, vehicle_type: VehicleType) -> Result<VehiclePricing, AppError> {
        self.get(vehicle_type)
            .filter(|pricing| pricing.is_active)
            .ok_or_else(|| AppError::InvalidVehicleType(vehicle_type.to_string()))
    }

    pub fn list_active(&self) -> Vec<VehiclePricing> {
        let mut active: Vec<VehiclePricing> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by_key(|pricing| pricing.base_fare);
        active
    }

    pub fn set_active(&self, vehicle_type: VehicleType, is_active: bool) -> Result<(), AppError> {
        let mut entry = self
            .entries
            .get_mut(&vehicle_type)
            .ok_or_else(|| AppError::InvalidVehicleType(vehicle_type.to_string()))?;
        entry.is_active = is_active;
        Ok(())
    }
}

fn default_pricing() -> [VehiclePricing; 3] {
    [
        VehiclePricing {
            vehicle_type: VehicleType::Auto,
            name: "Auto".to_string(),
            base_fare: 50,
            per_km_rate: 12.0,
            capacity: "Up to 200kg".to_string(),
            is_active: true,
        },
        VehiclePricing {
            vehicle_type: VehicleType::Tempo,
            name: "Tempo".to_string(),
            base_fare: 150,
            per_km_rate: 18.0,
            capacity: "Up to 1000kg".to_string(),
            is_active: true,
        },
        VehiclePricing {
            vehicle_type: VehicleType::Truck,
            name: "Truck".to_string(),
            base_fare: 300,
            per_km_rate: 25.0,
            capacity: "1000kg+".to_string(),
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::VehicleCatalog;
    use crate::error::AppError;
    use crate::models::vehicle::VehicleType;

    #[test]
    fn defaults_are_active_and_sorted_by_base_fare() {
        let catalog = VehicleCatalog::with_defaults();
        let kinds: Vec<_> = catalog.list_active().iter().map(|p| p.vehicle_type).collect();
        assert_eq!(kinds, VehicleType::ALL.to_vec());
    }

    #[test]
    fn inactive_entry_is_invalid_vehicle_type() {
        let catalog = VehicleCatalog::with_defaults();
        catalog.set_active(VehicleType::Truck, false).unwrap();

        assert_eq!(
            catalog.active(VehicleType::Truck),
            Err(AppError::InvalidVehicleType("truck".to_string()))
        );
        assert_eq!(catalog.list_active().len(), 2);
    }
}
