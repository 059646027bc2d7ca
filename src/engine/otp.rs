//! Phone-login codes. Independent from the trip-start code stored on each
//! booking.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::otp::OtpRecord;
use crate::observability::metrics::Metrics;

pub fn four_digit_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedOtp {
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

pub struct OtpService {
    records: DashMap<String, OtpRecord>,
    ttl: Duration,
    metrics: Metrics,
}

impl OtpService {
    pub fn new(ttl: Duration, metrics: Metrics) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
            metrics,
        }
    }

    pub fn issue(&self, phone: &str) -> IssuedOtp {
        self.issue_at(phone, Utc::now())
    }

    /// Replaces any earlier record for the phone.
    pub fn issue_at(&self, phone: &str, now: DateTime<Utc>) -> IssuedOtp {
        let record = OtpRecord {
            code: four_digit_code(),
            expires_at: now + self.ttl,
            consumed: false,
        };
        let issued = IssuedOtp {
            phone: phone.to_string(),
            code: record.code.clone(),
            expires_at: record.expires_at,
        };

        self.records.insert(phone.to_string(), record);
        info!(phone, expires_at = %issued.expires_at, "login code issued");
        issued
    }

    pub fn verify(&self, phone: &str, code: &str) -> bool {
        self.verify_at(phone, code, Utc::now())
    }

    /// Fails closed. A successful check consumes the record, so the same
    /// code never verifies twice.
    pub fn verify_at(&self, phone: &str, code: &str, now: DateTime<Utc>) -> bool {
        let outcome = match self.records.get_mut(phone) {
            None => "missing",
            Some(mut record) => {
                if record.consumed {
                    "consumed"
                } else if record.is_expired(now) {
                    "expired"
                } else if record.code != code.trim() {
                    "mismatch"
                } else {
                    record.consumed = true;
                    "verified"
                }
            }
        };

        self.metrics
            .otp_verifications_total
            .with_label_values(&[outcome])
            .inc();

        let verified = outcome == "verified";
        if verified {
            self.records.remove_if(phone, |_, record| record.consumed);
        }
        debug!(phone, outcome, "login code checked");
        verified
    }

    /// Drops expired and consumed records. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.consumed && !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
