//! Forward geocoding: postal code to coordinates.
//! Uses Zippopotam.us - free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, WeatherError};

const ZIPPOPOTAM_URL: &str = "https://api.zippopotam.us";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "SnowDay/0.1.0";

/// Resolves a postal code to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// # Errors
    /// `WeatherError::LocationNotFound` for an empty, unknown or malformed code.
    async fn resolve(&self, postal_code: &str) -> Result<Coordinates, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ZippopotamResponse {
    #[serde(default)]
    places: Vec<ZippopotamPlace>,
}

#[derive(Debug, Deserialize)]
struct ZippopotamPlace {
    latitude: serde_json::Value,
    longitude: serde_json::Value,
    #[serde(rename = "place name")]
    place_name: Option<String>,
    #[serde(rename = "state abbreviation")]
    state_abbreviation: Option<String>,
}

/// Geocoder backed by a Zippopotam-style `{base}/{country}/{code}` endpoint.
#[derive(Debug, Clone)]
pub struct ZippopotamGeocoder {
    client: Client,
    base_url: String,
    country_code: String,
    retry: RetryConfig,
}

impl ZippopotamGeocoder {
    pub fn new(country_code: &str) -> Result<Self, WeatherError> {
        Self::with_base_url(ZIPPOPOTAM_URL, country_code, RetryConfig::default())
    }

    pub fn with_base_url(
        base_url: &str,
        country_code: &str,
        retry: RetryConfig,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country_code: country_code.trim().to_lowercase(),
            retry,
        })
    }

    fn lookup_url(&self, postal_code: &str) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| WeatherError::LocationNotFound(format!("Bad geocoder URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| WeatherError::LocationNotFound("Bad geocoder URL".to_string()))?
            .pop_if_empty()
            .push(&self.country_code)
            .push(postal_code);
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for ZippopotamGeocoder {
    #[instrument(skip(self), level = "info")]
    async fn resolve(&self, postal_code: &str) -> Result<Coordinates, WeatherError> {
        let postal_code = postal_code.trim();
        if postal_code.is_empty() {
            return Err(WeatherError::LocationNotFound(
                "empty postal code".to_string(),
            ));
        }

        let url = self.lookup_url(postal_code)?;
        let response = with_retry(&self.retry, || self.client.get(url.clone()).send()).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound(postal_code.to_string()));
        }
        if !status.is_success() {
            return Err(WeatherError::ForecastUnavailable(format!(
                "geocoder returned status {}",
                status
            )));
        }

        let body: ZippopotamResponse = response.json().await.map_err(|e| {
            tracing::debug!("Geocode parse error: {}", e);
            WeatherError::LocationNotFound(postal_code.to_string())
        })?;

        let coordinates = first_place(body)
            .ok_or_else(|| WeatherError::LocationNotFound(postal_code.to_string()))?;

        tracing::info!(
            "Geocoded {} to {}, {}",
            postal_code,
            coordinates.latitude,
            coordinates.longitude
        );
        Ok(coordinates)
    }
}

fn first_place(body: ZippopotamResponse) -> Option<Coordinates> {
    let place = body.places.into_iter().next()?;
    let latitude = coordinate(&place.latitude)?;
    let longitude = coordinate(&place.longitude)?;

    let place_name = match (place.place_name, place.state_abbreviation) {
        (Some(name), Some(state)) if !state.is_empty() => Some(format!("{}, {}", name, state)),
        (name, _) => name,
    };

    Some(Coordinates {
        latitude,
        longitude,
        place_name,
    })
}

/// Zippopotam returns coordinates as strings; accept numbers too.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}
