use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;

use crate::geo::{Coordinates, Geofence};

#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_level: tracing::Level,

    // Geofence
    pub office_lat: f64,
    pub office_lng: f64,
    pub geofence_radius_m: f64,
    pub auto_checkout_hours: i64,

    // Reverse geocoding, empty url disables lookups
    pub geocoder_url: String,
    pub geocoder_timeout_ms: u64,
    pub geocoder_cache_ttl_secs: u64,

    pub seed_demo_data: bool,
    pub demo_password: String,
}

/// Upper bound for `AUTO_CHECKOUT_HOURS`; a punch must close on the day it opened.
const MAX_AUTO_CHECKOUT_HOURS: i64 = 24;

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_level: match env::var("LOG_LEVEL") {
                Ok(raw) => tracing::Level::from_str(raw.trim())
                    .map_err(|e| anyhow::anyhow!("LOG_LEVEL has an invalid value {raw:?}: {e}"))?,
                Err(_) => tracing::Level::DEBUG,
            },

            office_lat: var_or("OFFICE_LAT", 26.73208)?,
            office_lng: var_or("OFFICE_LNG", 68.071982)?,
            geofence_radius_m: var_or("GEOFENCE_RADIUS_M", 200.0)?,
            auto_checkout_hours: var_or("AUTO_CHECKOUT_HOURS", 12)?,

            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/reverse".to_string()),
            geocoder_timeout_ms: var_or("GEOCODER_TIMEOUT_MS", 3000)?,
            geocoder_cache_ttl_secs: var_or("GEOCODER_CACHE_TTL_SECS", 86_400)?,

            seed_demo_data: var_or("SEED_DEMO_DATA", true)?,
            demo_password: env::var("DEMO_PASSWORD").unwrap_or_else(|_| "password".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects geofence and auto-checkout settings that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        if !(self.office_lat.is_finite() && (-90.0..=90.0).contains(&self.office_lat)) {
            bail!("OFFICE_LAT must be within [-90, 90], got {}", self.office_lat);
        }
        if !(self.office_lng.is_finite() && (-180.0..=180.0).contains(&self.office_lng)) {
            bail!("OFFICE_LNG must be within [-180, 180], got {}", self.office_lng);
        }
        if !(self.geofence_radius_m.is_finite() && self.geofence_radius_m > 0.0) {
            bail!(
                "GEOFENCE_RADIUS_M must be a positive number of meters, got {}",
                self.geofence_radius_m
            );
        }
        if !(1..=MAX_AUTO_CHECKOUT_HOURS).contains(&self.auto_checkout_hours) {
            bail!(
                "AUTO_CHECKOUT_HOURS must be between 1 and {MAX_AUTO_CHECKOUT_HOURS}, got {}",
                self.auto_checkout_hours
            );
        }
        Ok(())
    }

    pub fn geofence(&self) -> Geofence {
        Geofence::new(
            Coordinates::new(self.office_lat, self.office_lng),
            self.geofence_radius_m,
        )
    }

    pub fn auto_checkout_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auto_checkout_hours)
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_millis(self.geocoder_timeout_ms)
    }

    /// Settings for tests and local tooling; never reads the environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_level: tracing::Level::DEBUG,
            office_lat: 26.73208,
            office_lng: 68.071982,
            geofence_radius_m: 200.0,
            auto_checkout_hours: 12,
            geocoder_url: String::new(),
            geocoder_timeout_ms: 500,
            geocoder_cache_ttl_secs: 60,
            seed_demo_data: true,
            demo_password: "password".to_string(),
        }
    }
}
