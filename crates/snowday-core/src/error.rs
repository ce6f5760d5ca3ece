//! Centralized error types for SnowDay.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the workspace
//! - Provides short, actionable messages suitable for display
//! - Preserves full error context for logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Prediction(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Persisted key-value storage errors (forecast cache, vote tally).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "Local storage is unavailable. Results won't be saved.",
            StorageError::QueryFailed(_) => "A storage operation failed. Please try again.",
            StorageError::Corruption(_) => "Saved data may be corrupted. Consider clearing it.",
            StorageError::Serialization(_) => "Saved data could not be read.",
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown weight: {0}")]
    UnknownWeight(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::UnknownWeight(_) => "Unknown algorithm weight. Check the weight name.",
        }
    }
}

/// Errors surfaced by a closure-probability calculation.
///
/// Only `MissingInput` and `Busy` are raised before any network attempt.
/// Everything else leaves the session in its failed state with manual
/// entry offered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("No location given and manual mode is off")]
    MissingInput,

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("Forecast request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("A calculation is already in progress")]
    Busy,

    #[error("Calculation was cancelled")]
    Cancelled,
}

impl PredictionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PredictionError::MissingInput => {
                "Enter a postal code or switch to manual weather entry."
            }
            PredictionError::LocationNotFound(_) => {
                "We couldn't find that postal code. Check it or enter the weather manually."
            }
            PredictionError::ForecastUnavailable(_) => {
                "The forecast service returned unexpected data. \
                 Try again or enter the weather manually."
            }
            PredictionError::Timeout { .. } => {
                "The forecast took too long to load. Enter the weather manually to continue."
            }
            PredictionError::StorageUnavailable(_) => {
                "Local storage is unavailable. Results won't be saved."
            }
            PredictionError::Busy => "A prediction is already running. Please wait.",
            PredictionError::Cancelled => "The prediction was cancelled.",
        }
    }

    /// Whether the caller should be switched into manual weather entry.
    pub fn offers_manual_override(&self) -> bool {
        matches!(
            self,
            PredictionError::LocationNotFound(_)
                | PredictionError::ForecastUnavailable(_)
                | PredictionError::Timeout { .. }
                | PredictionError::StorageUnavailable(_)
        )
    }
}

impl From<StorageError> for PredictionError {
    fn from(e: StorageError) -> Self {
        PredictionError::StorageUnavailable(e.to_string())
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::DatabaseBusy
                        | rusqlite::ErrorCode::DatabaseLocked
                        | rusqlite::ErrorCode::ReadOnly
                ) =>
            {
                StorageError::Unavailable(self.to_string())
            }
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let messages = [
            StorageError::QueryFailed("test".into()).user_message(),
            ConfigError::Invalid("test".into()).user_message(),
            PredictionError::MissingInput.user_message(),
            PredictionError::Timeout { after_ms: 8000 }.user_message(),
            PredictionError::Busy.user_message(),
        ];

        for msg in messages {
            assert!(!msg.is_empty());
        }
    }

    #[test]
    fn test_storage_error_reaches_app_error() {
        let app_err: AppError = StorageError::Unavailable("read-only".into()).into();
        assert!(app_err.user_message().contains("won't be saved"));
    }

    #[test]
    fn test_app_error_conversion() {
        let err = PredictionError::MissingInput;
        let app_err: AppError = err.into();
        assert!(matches!(
            app_err,
            AppError::Prediction(PredictionError::MissingInput)
        ));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Prediction(PredictionError::Timeout { after_ms: 8000 });
        assert!(app_err.user_message().contains("manually"));
    }

    #[test]
    fn test_network_failures_offer_manual_override() {
        assert!(PredictionError::Timeout { after_ms: 8000 }.offers_manual_override());
        assert!(PredictionError::LocationNotFound("00000".into()).offers_manual_override());
        assert!(PredictionError::ForecastUnavailable("x".into()).offers_manual_override());
        assert!(!PredictionError::MissingInput.offers_manual_override());
        assert!(!PredictionError::Busy.offers_manual_override());
    }

    #[test]
    fn test_storage_error_degrades_to_prediction_error() {
        let err: PredictionError = StorageError::Unavailable("disk full".into()).into();
        assert!(matches!(
            err,
            PredictionError::StorageUnavailable(msg) if msg.contains("disk full")
        ));
    }

    #[test]
    fn test_rusqlite_error_mapping() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_storage_error();
        assert!(matches!(err, StorageError::QueryFailed(_)));
    }
}
