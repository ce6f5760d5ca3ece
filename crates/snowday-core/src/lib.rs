//! Shared foundation for the SnowDay workspace: configuration, the error
//! hierarchy and logging setup.

pub mod config;
pub mod error;

pub use config::{
    Config, DefaultsConfig, ForecastConfig, StorageConfig, ValidationResult, KNOWN_WEIGHT_NAMES,
};
pub use error::{
    AppError, ConfigError, NetworkError, PredictionError, ReqwestErrorExt, RusqliteErrorExt,
    StorageError,
};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honors `RUST_LOG`; falls back to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("SnowDay core initialized");
    Ok(())
}
