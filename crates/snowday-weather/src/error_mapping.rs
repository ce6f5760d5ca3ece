//! Conversion of adapter errors into calculation errors.

use snowday_core::{PredictionError, ReqwestErrorExt};

use crate::types::WeatherError;

impl From<WeatherError> for PredictionError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::LocationNotFound(code) => PredictionError::LocationNotFound(code),
            WeatherError::ForecastUnavailable(reason) => {
                PredictionError::ForecastUnavailable(reason)
            }
            WeatherError::Timeout { after_ms } => PredictionError::Timeout { after_ms },
            WeatherError::Cancelled => PredictionError::Cancelled,
            WeatherError::Network(e) => {
                PredictionError::ForecastUnavailable(e.into_network_error().to_string())
            }
        }
    }
}
