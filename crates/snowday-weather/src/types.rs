use serde::{Deserialize, Serialize};

/// Number of hourly samples in a forecast day.
pub const HOURS_PER_DAY: usize = 24;

/// One hour of weather, already in the units the scoring engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WeatherSample {
    pub snowfall_cm: f64,
    pub temperature_c: f64,
    pub precipitation_probability_pct: f64,
    pub wind_speed_kmh: f64,
}

impl WeatherSample {
    pub fn new(
        snowfall_cm: f64,
        temperature_c: f64,
        precipitation_probability_pct: f64,
        wind_speed_kmh: f64,
    ) -> Self {
        Self {
            snowfall_cm,
            temperature_c,
            precipitation_probability_pct,
            wind_speed_kmh,
        }
    }

    /// Field-wise arithmetic mean. Returns `None` for an empty slice.
    pub fn average(samples: &[WeatherSample]) -> Option<WeatherSample> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let sum = samples.iter().fold(WeatherSample::default(), |acc, s| {
            WeatherSample {
                snowfall_cm: acc.snowfall_cm + s.snowfall_cm,
                temperature_c: acc.temperature_c + s.temperature_c,
                precipitation_probability_pct: acc.precipitation_probability_pct
                    + s.precipitation_probability_pct,
                wind_speed_kmh: acc.wind_speed_kmh + s.wind_speed_kmh,
            }
        });
        Some(WeatherSample {
            snowfall_cm: sum.snowfall_cm / n,
            temperature_c: sum.temperature_c / n,
            precipitation_probability_pct: sum.precipitation_probability_pct / n,
            wind_speed_kmh: sum.wind_speed_kmh / n,
        })
    }
}

/// A forecast day: index 0 is the current hour.
pub type HourlySamples = [WeatherSample; HOURS_PER_DAY];

/// Repeat one sample across the whole day (manual entry).
pub fn replicate(sample: WeatherSample) -> HourlySamples {
    [sample; HOURS_PER_DAY]
}

/// Geographic location resolved from a postal code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: Option<String>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            place_name: None,
        }
    }
}

/// Geocoding and forecast errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),
    #[error("Forecast request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("Forecast request cancelled")]
    Cancelled,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_average_of_two() {
        let avg = WeatherSample::average(&[
            WeatherSample::new(2.0, -4.0, 40.0, 10.0),
            WeatherSample::new(4.0, 0.0, 80.0, 30.0),
        ])
        .unwrap();

        assert_eq!(avg, WeatherSample::new(3.0, -2.0, 60.0, 20.0));
    }

    #[test]
    fn test_average_of_empty_is_none() {
        assert!(WeatherSample::average(&[]).is_none());
    }

    #[test]
    fn test_replicate_fills_day() {
        let sample = WeatherSample::new(1.0, 2.0, 3.0, 4.0);
        let day = replicate(sample);
        assert_eq!(day.len(), HOURS_PER_DAY);
        assert!(day.iter().all(|s| *s == sample));
    }

    #[test]
    fn test_sample_serde_field_names() {
        let json = serde_json::to_value(WeatherSample::new(8.0, -5.0, 60.0, 30.0)).unwrap();
        assert_eq!(json["snowfall_cm"], 8.0);
        assert_eq!(json["wind_speed_kmh"], 30.0);
    }
}
