//! Reverse geocoding for check-in/check-out locations.
//!
//! Address lookup is best-effort: every failure mode (disabled lookup, HTTP
//! error, bad payload, timeout) degrades to a literal coordinate string.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::Coordinates;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    pub address: String,
    pub map_uri: Option<String>,
}

#[derive(Debug, Display)]
pub enum GeoError {
    #[display(fmt = "Reverse geocoding is disabled")]
    Disabled,

    #[display(fmt = "Reverse geocoding timed out after {}ms", _0)]
    Timeout(u64),

    #[display(fmt = "HTTP error: {}", _0)]
    Http(reqwest::Error),

    #[display(fmt = "Invalid response from geocoder: {}", _0)]
    InvalidResponse(String),
}

impl std::error::Error for GeoError {}

impl From<reqwest::Error> for GeoError {
    fn from(e: reqwest::Error) -> Self {
        GeoError::Http(e)
    }
}

#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, coords: Coordinates) -> Result<ResolvedAddress, GeoError>;
}

/// Used when no geocoder URL is configured.
pub struct DisabledResolver;

#[async_trait]
impl GeoResolver for DisabledResolver {
    async fn resolve(&self, _coords: Coordinates) -> Result<ResolvedAddress, GeoError> {
        Err(GeoError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Nominatim-compatible `/reverse` endpoint.
pub struct NominatimResolver {
    client: Client,
    url: String,
}

impl NominatimResolver {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoResolver for NominatimResolver {
    async fn resolve(&self, coords: Coordinates) -> Result<ResolvedAddress, GeoError> {
        debug!(lat = coords.latitude, lon = coords.longitude, "Calling reverse geocoder");

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::InvalidResponse(format!("status {}", status)));
        }

        let body: NominatimReverse = response.json().await?;
        if let Some(err) = body.error {
            return Err(GeoError::InvalidResponse(err));
        }

        let address = body
            .display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| GeoError::InvalidResponse("missing display_name".to_string()))?;

        Ok(ResolvedAddress {
            address: address.trim().to_string(),
            map_uri: Some(map_link(coords)),
        })
    }
}

pub fn map_link(coords: Coordinates) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=18/{lat}/{lon}",
        lat = coords.latitude,
        lon = coords.longitude
    )
}

/// Caches successful lookups keyed by coordinates rounded to 4 decimals (~11 m).
pub struct CachedResolver {
    inner: Arc<dyn GeoResolver>,
    cache: Cache<(i64, i64), ResolvedAddress>,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn GeoResolver>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    fn cache_key(coords: Coordinates) -> (i64, i64) {
        (
            (coords.latitude * 10_000.0).round() as i64,
            (coords.longitude * 10_000.0).round() as i64,
        )
    }
}

#[async_trait]
impl GeoResolver for CachedResolver {
    async fn resolve(&self, coords: Coordinates) -> Result<ResolvedAddress, GeoError> {
        let key = Self::cache_key(coords);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let resolved = self.inner.resolve(coords).await?;
        self.cache.insert(key, resolved.clone()).await;
        Ok(resolved)
    }
}

/// Timeout-bounded lookup that always yields an address.
pub struct AddressLookup {
    resolver: Arc<dyn GeoResolver>,
    timeout: Duration,
}

impl AddressLookup {
    pub fn new(resolver: Arc<dyn GeoResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    pub async fn resolve(&self, coords: Coordinates) -> ResolvedAddress {
        let outcome = match tokio::time::timeout(self.timeout, self.resolver.resolve(coords)).await
        {
            Ok(result) => result,
            Err(_) => Err(GeoError::Timeout(self.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(resolved) => resolved,
            Err(GeoError::Disabled) => fallback_address(coords),
            Err(e) => {
                warn!(error = %e, lat = coords.latitude, lon = coords.longitude, "Address lookup failed, using coordinates");
                fallback_address(coords)
            }
        }
    }
}

pub fn fallback_address(coords: Coordinates) -> ResolvedAddress {
    ResolvedAddress {
        address: format!("Coords: ({:.4}, {:.4})", coords.latitude, coords.longitude),
        map_uri: None,
    }
}
