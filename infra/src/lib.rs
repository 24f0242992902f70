//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer of the StayRealtor OTP workspace.
//! It provides the concrete collaborators the verification flow talks to and the
//! process-level setup around it.
//!
//! ## Architecture
//!
//! - **OTP**: HTTP client for the hosted OTP function and an in-process mock provider
//! - **Logging**: tracing subscriber initialisation from [`LoggingConfig`](otp_shared::LoggingConfig)
//! - **Configuration**: layered loading of [`AppConfig`] from defaults, file, and environment

use std::path::Path;

use otp_shared::config::{AppConfig, Environment};
use otp_shared::validation::Validate;

// Re-export core types for convenience
pub use otp_core::errors::*;

/// Logging module - tracing subscriber setup
pub mod logging;

/// OTP service module - delivery and verification providers
pub mod otp;

pub use logging::init_tracing;
pub use otp::{create_otp_services, HttpOtpClient, MockOtpService, OtpServices};

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "OTP";

/// Load application configuration
///
/// Sources, later ones overriding earlier ones:
/// 1. Built-in defaults for the environment named by `ENVIRONMENT`
/// 2. The TOML file at `path`, or `otp.<environment>.toml` in the working directory if present
/// 3. Variables such as `OTP__FLOW__SMS_COUNTDOWN_SECS=45`
///
/// A `.env` file is read first when present. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    let environment = Environment::from_env();
    let defaults = serde_json::to_string(&AppConfig::for_environment(environment))
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::from(Path::new(environment.config_file())).required(false),
    };

    let settings = config::Config::builder()
        .add_source(config::File::from_str(&defaults, config::FileFormat::Json))
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    let app_config: AppConfig = settings
        .try_deserialize()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    app_config
        .validate()
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;

    tracing::debug!(
        environment = %app_config.environment,
        provider = ?app_config.otp_service.provider,
        "Configuration loaded"
    );

    Ok(app_config)
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),
}
