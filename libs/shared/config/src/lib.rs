use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    /// Offset of the clinic's local day boundary from UTC, in minutes.
    /// Daily metrics ("completed today", no-show rate) are bucketed by
    /// this local day, not by UTC midnight.
    pub clinic_utc_offset_minutes: i32,
    /// Heuristic per-patient service time used for wait estimates.
    pub average_service_minutes: i64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("QUEUE_JWT_SECRET").unwrap_or_else(|_| {
                warn!("QUEUE_JWT_SECRET not set, using empty value");
                String::new()
            }),
            redis_url: env::var("REDIS_URL").ok(),
            clinic_utc_offset_minutes: env::var("CLINIC_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("CLINIC_UTC_OFFSET_MINUTES not set, using UTC day boundary");
                    0
                }),
            average_service_minutes: env::var("AVG_SERVICE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_redis_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}
