//! Structured logging initialisation
//!
//! The filter level can be overridden at runtime via the `RUST_LOG` environment
//! variable. When `RUST_LOG` is not set, the configured level is used.

use otp_shared::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::InfrastructureError;

/// Install the global tracing subscriber described by `config`
///
/// Returns [`InfrastructureError::Logging`] when the level does not parse or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(config.colored)
                    .with_target(config.with_target)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(config.colored)
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    installed.map_err(|e| InfrastructureError::Logging(e.to_string()))
}

fn build_filter(level: &str) -> Result<EnvFilter, InfrastructureError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| InfrastructureError::Logging(format!("invalid level '{}': {}", level, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_reported() {
        std::env::remove_var("RUST_LOG");
        let result = build_filter("otp_core=loudest");
        assert!(matches!(result, Err(InfrastructureError::Logging(_))));
    }

    #[test]
    fn test_second_init_fails_instead_of_panicking() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            colored: false,
            with_target: false,
            source_location: false,
        };

        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
