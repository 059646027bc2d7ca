use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{Role, User};

/// In-process user directory: lookups by id and by phone.
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<Uuid, User>,
    phones: DashMap<String, Uuid>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) -> User {
        self.phones.insert(user.phone.clone(), user.id);
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns the user registered under `phone`, creating one with `role`
    /// if none exists. The bool is true when a user was created.
    pub fn get_or_create_by_phone(&self, phone: &str, role: Role) -> (User, bool) {
        match self.phones.entry(phone.to_string()) {
            Entry::Occupied(mut entry) => {
                if let Some(user) = self.get(*entry.get()) {
                    return (user, false);
                }
                let user = User::new("", phone, role);
                self.users.insert(user.id, user.clone());
                entry.insert(user.id);
                (user, true)
            }
            Entry::Vacant(entry) => {
                let user = User::new("", phone, role);
                self.users.insert(user.id, user.clone());
                entry.insert(user.id);
                (user, true)
            }
        }
    }

    pub fn update<F>(&self, id: Uuid, apply: F) -> Result<User, AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }

    /// Adds one trip and `amount` earnings for `booking_id`. Crediting the
    /// same booking twice is a no-op; returns whether anything changed.
    pub fn credit_trip(
        &self,
        driver_id: Uuid,
        booking_id: Uuid,
        amount: u32,
    ) -> Result<bool, AppError> {
        let mut credited = false;
        self.update(driver_id, |driver| {
            if driver.credited_bookings.insert(booking_id) {
                driver.total_trips += 1;
                driver.total_earnings += u64::from(amount);
                credited = true;
            }
        })?;
        Ok(credited)
    }
}
