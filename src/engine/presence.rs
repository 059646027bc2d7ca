use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::RealtimeEvent;
use crate::models::place::GeoPoint;
use crate::models::user::{Role, User};
use crate::realtime::EventPublisher;
use crate::store::users::UserDirectory;

/// Last-known online flag and location per driver. No history is kept.
pub struct PresenceTracker {
    users: Arc<UserDirectory>,
    publisher: Arc<dyn EventPublisher>,
}

impl PresenceTracker {
    pub fn new(users: Arc<UserDirectory>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { users, publisher }
    }

    pub fn set_online(&self, driver_id: Uuid, is_online: bool) -> Result<User, AppError> {
        self.write_online(driver_id, |_| is_online)
    }

    pub fn toggle_online(&self, driver_id: Uuid) -> Result<User, AppError> {
        self.write_online(driver_id, |current| !current)
    }

    /// Computes and stores the new flag under the user's entry lock, then
    /// publishes the value that was actually written.
    fn write_online<F>(&self, driver_id: Uuid, next: F) -> Result<User, AppError>
    where
        F: FnOnce(bool) -> bool,
    {
        self.ensure_driver(driver_id)?;
        let driver = self
            .users
            .update(driver_id, |driver| driver.is_online = next(driver.is_online))?;

        let is_online = driver.is_online;
        info!(driver_id = %driver_id, is_online, "driver presence changed");
        self.publisher.publish(RealtimeEvent::DriverStatus {
            driver_id,
            is_online,
        });
        Ok(driver)
    }

    pub fn update_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> Result<User, AppError> {
        let point = GeoPoint { lat, lng };
        if !point.is_valid() {
            return Err(AppError::InvalidInput(
                "location coordinates are out of range".to_string(),
            ));
        }

        self.ensure_driver(driver_id)?;
        let driver = self
            .users
            .update(driver_id, |driver| driver.location = Some(point))?;

        self.publisher
            .publish(RealtimeEvent::DriverLocation { driver_id, lat, lng });
        Ok(driver)
    }

    fn ensure_driver(&self, driver_id: Uuid) -> Result<User, AppError> {
        let user = self
            .users
            .get(driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        if user.role != Role::Driver {
            return Err(AppError::Forbidden("only drivers report presence".to_string()));
        }
        Ok(user)
    }
}
