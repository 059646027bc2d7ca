use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{self, Duration};
use tracing::{debug, info};

use crate::engine::otp::OtpService;
use crate::store::sessions::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub login_codes: usize,
    pub sessions: usize,
}

/// Evicts expired login codes and sessions as of `now`.
pub fn sweep_expired(
    otp: &OtpService,
    sessions: &SessionStore,
    now: DateTime<Utc>,
) -> SweepReport {
    SweepReport {
        login_codes: otp.purge_expired(now),
        sessions: sessions.purge_expired(now),
    }
}

pub async fn run_expiry_sweeper(
    otp: Arc<OtpService>,
    sessions: Arc<SessionStore>,
    every: Duration,
) {
    info!(interval_secs = every.as_secs(), "expiry sweeper started");
    let mut ticker = time::interval(every);

    loop {
        ticker.tick().await;
        let report = sweep_expired(&otp, &sessions, Utc::now());
        if report != SweepReport::default() {
            debug!(
                login_codes = report.login_codes,
                sessions = report.sessions,
                "expired records purged"
            );
        }
    }
}
