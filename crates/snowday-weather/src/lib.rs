//! Weather inputs for the closure-probability engine.
//!
//! Resolves postal codes to coordinates, fetches a 24-hour hourly forecast
//! from Open-Meteo, and keeps recent forecasts in a TTL cache.

pub mod cache;
mod error_mapping;
pub mod geocode;
pub mod provider;
pub mod retry;
pub mod types;

pub use cache::{cache_key, CacheEntry, ForecastCache, CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL};
pub use geocode::{Geocoder, ZippopotamGeocoder};
pub use provider::{ForecastClient, OpenMeteoClient, DEFAULT_FETCH_TIMEOUT};
pub use retry::RetryConfig;
pub use types::*;
