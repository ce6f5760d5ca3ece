//! Hourly forecast fetching from Open-Meteo.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, HourlySamples, WeatherError, WeatherSample, HOURS_PER_DAY};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
const USER_AGENT: &str = "SnowDay/0.1.0";
const HOURLY_FIELDS: &str = "temperature_2m,snowfall,precipitation_probability,wind_speed_10m";

/// Recommended deadline for one forecast fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(8000);

/// Raw snowfall units per centimeter.
const SNOWFALL_DIVISOR: f64 = 10.0;
/// Meters per second to kilometers per hour.
const WIND_MS_TO_KMH: f64 = 3.6;

/// Fetches the next 24 hours of weather for a coordinate.
#[async_trait]
pub trait ForecastClient: Send + Sync {
    /// Hour 0 of the result is the current hour.
    ///
    /// # Errors
    /// `Timeout` when nothing arrives within `cancel_after`, `Cancelled` when
    /// `cancel` fires first, `ForecastUnavailable` for a malformed payload.
    async fn fetch_hourly(
        &self,
        coordinates: &Coordinates,
        cancel_after: Duration,
        cancel: &CancellationToken,
    ) -> Result<HourlySamples, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    temperature_2m: Option<Vec<Option<f64>>>,
    snowfall: Option<Vec<Option<f64>>>,
    precipitation_probability: Option<Vec<Option<f64>>>,
    wind_speed_10m: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_URL, RetryConfig::default())
    }

    pub fn with_base_url(base_url: &str, retry: RetryConfig) -> Result<Self, WeatherError> {
        // No client-level timeout: the deadline is enforced per fetch.
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn request_hourly(
        &self,
        coordinates: &Coordinates,
    ) -> Result<HourlySamples, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let latitude = coordinates.latitude.to_string();
        let longitude = coordinates.longitude.to_string();
        let forecast_hours = HOURS_PER_DAY.to_string();
        let query = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("hourly", HOURLY_FIELDS),
            ("forecast_hours", forecast_hours.as_str()),
            ("wind_speed_unit", "ms"),
            ("timezone", "auto"),
        ];

        let response =
            with_retry(&self.retry, || self.client.get(&url).query(&query).send()).await?;

        if !response.status().is_success() {
            return Err(WeatherError::ForecastUnavailable(format!(
                "forecast service returned status {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::ForecastUnavailable(format!("unreadable payload: {}", e)))?;

        parse_hourly(body)
    }
}

#[async_trait]
impl ForecastClient for OpenMeteoClient {
    #[instrument(skip(self, cancel), level = "info")]
    async fn fetch_hourly(
        &self,
        coordinates: &Coordinates,
        cancel_after: Duration,
        cancel: &CancellationToken,
    ) -> Result<HourlySamples, WeatherError> {
        // Dropping the request future aborts the in-flight HTTP call.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Forecast fetch cancelled");
                Err(WeatherError::Cancelled)
            }
            _ = tokio::time::sleep(cancel_after) => {
                tracing::warn!("Forecast fetch timed out after {:?}", cancel_after);
                Err(WeatherError::Timeout {
                    after_ms: cancel_after.as_millis() as u64,
                })
            }
            result = self.request_hourly(coordinates) => result,
        }
    }
}

fn parse_hourly(body: ForecastResponse) -> Result<HourlySamples, WeatherError> {
    let hourly = body
        .hourly
        .ok_or_else(|| WeatherError::ForecastUnavailable("missing hourly block".to_string()))?;

    let temperature = required_series(hourly.temperature_2m, "temperature_2m")?;
    let snowfall = required_series(hourly.snowfall, "snowfall")?;
    let precipitation =
        required_series(hourly.precipitation_probability, "precipitation_probability")?;
    let wind = required_series(hourly.wind_speed_10m, "wind_speed_10m")?;

    let mut samples = [WeatherSample::default(); HOURS_PER_DAY];
    for (hour, sample) in samples.iter_mut().enumerate() {
        *sample = WeatherSample {
            snowfall_cm: snowfall[hour] / SNOWFALL_DIVISOR,
            temperature_c: temperature[hour],
            precipitation_probability_pct: precipitation[hour],
            wind_speed_kmh: wind[hour] * WIND_MS_TO_KMH,
        };
    }
    Ok(samples)
}

/// At least 24 entries; nulls read as 0.
fn required_series(
    series: Option<Vec<Option<f64>>>,
    name: &str,
) -> Result<Vec<f64>, WeatherError> {
    let series =
        series.ok_or_else(|| WeatherError::ForecastUnavailable(format!("missing {}", name)))?;
    if series.len() < HOURS_PER_DAY {
        return Err(WeatherError::ForecastUnavailable(format!(
            "{} has {} hourly values, expected {}",
            name,
            series.len(),
            HOURS_PER_DAY
        )));
    }
    Ok(series
        .into_iter()
        .take(HOURS_PER_DAY)
        .map(|v| v.unwrap_or(0.0))
        .collect())
}
