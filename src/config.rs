use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub otp_ttl_secs: i64,
    pub otp_sweep_interval_secs: u64,
    pub session_ttl_hours: i64,
    /// Echo issued login codes in the response. Development only.
    pub expose_dev_otp: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            otp_ttl_secs: 300,
            otp_sweep_interval_secs: 60,
            session_ttl_hours: 168,
            expose_dev_otp: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact/json"
                )));
            }
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            otp_ttl_secs: parse_or_default("OTP_TTL_SECS", defaults.otp_ttl_secs)?,
            otp_sweep_interval_secs: parse_or_default(
                "OTP_SWEEP_INTERVAL_SECS",
                defaults.otp_sweep_interval_secs,
            )?,
            session_ttl_hours: parse_or_default("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            expose_dev_otp: parse_or_default("EXPOSE_DEV_OTP", defaults.expose_dev_otp)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
