use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::engine::lifecycle::BookingLifecycle;
use crate::engine::otp::OtpService;
use crate::engine::presence::PresenceTracker;
use crate::observability::metrics::Metrics;
use crate::realtime::{Broadcaster, EventPublisher};
use crate::store::bookings::BookingStore;
use crate::store::sessions::SessionStore;
use crate::store::users::UserDirectory;
use crate::store::vehicles::VehicleCatalog;

pub struct AppState {
    pub bookings: Arc<BookingStore>,
    pub users: Arc<UserDirectory>,
    pub vehicles: Arc<VehicleCatalog>,
    pub sessions: Arc<SessionStore>,
    pub otp: Arc<OtpService>,
    pub broadcaster: Arc<Broadcaster>,
    pub lifecycle: BookingLifecycle,
    pub presence: PresenceTracker,
    pub metrics: Metrics,
    pub expose_dev_otp: bool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let metrics = Metrics::new();
        let bookings = Arc::new(BookingStore::new());
        let users = Arc::new(UserDirectory::new());
        let vehicles = Arc::new(VehicleCatalog::with_defaults());
        let broadcaster = Arc::new(Broadcaster::new(config.event_buffer_size, metrics.clone()));
        let publisher: Arc<dyn EventPublisher> = broadcaster.clone();

        Self {
            lifecycle: BookingLifecycle::new(
                bookings.clone(),
                users.clone(),
                vehicles.clone(),
                publisher.clone(),
                metrics.clone(),
            ),
            presence: PresenceTracker::new(users.clone(), publisher),
            otp: Arc::new(OtpService::new(
                Duration::seconds(config.otp_ttl_secs),
                metrics.clone(),
            )),
            sessions: Arc::new(SessionStore::new(Duration::hours(config.session_ttl_hours))),
            bookings,
            users,
            vehicles,
            broadcaster,
            metrics,
            expose_dev_otp: config.expose_dev_otp,
        }
    }
}
