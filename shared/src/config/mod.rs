//! Configuration module
//!
//! - `environment` - Environment detection and logging configuration
//! - `flow` - Countdown timing and numbering plan of the verification flow
//! - `otp_service` - External OTP provider endpoint

pub mod environment;
pub mod flow;
pub mod otp_service;

use serde::{Deserialize, Serialize};

use crate::utils::validation::{validators, Validate, ValidationErrors};

pub use environment::{Environment, LogFormat, LoggingConfig};
pub use flow::FlowSettings;
pub use otp_service::{OtpProvider, OtpServiceConfig, DEFAULT_OTP_BASE_URL};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Verification flow settings
    #[serde(default)]
    pub flow: FlowSettings,

    /// OTP provider settings
    #[serde(default)]
    pub otp_service: OtpServiceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl AppConfig {
    /// Defaults for the given environment
    pub fn for_environment(environment: Environment) -> Self {
        let otp_service = if environment.is_production() {
            OtpServiceConfig {
                provider: OtpProvider::Http,
                ..Default::default()
            }
        } else {
            OtpServiceConfig::default()
        };

        Self {
            environment,
            flow: FlowSettings::default(),
            otp_service,
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Defaults for the environment named by `ENVIRONMENT`/`ENV`/`RUST_ENV`
    pub fn from_env() -> Self {
        Self::for_environment(Environment::from_env())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.flow.country_code.starts_with('+')
            || self.flow.country_code.len() < 2
            || !self.flow.country_code[1..].chars().all(|c| c.is_ascii_digit())
        {
            errors.add_error("flow.country_code", "must look like +91", "INVALID_FORMAT");
        }
        if self.flow.sms_countdown_secs == 0 {
            errors.add_error("flow.sms_countdown_secs", "must be positive", "OUT_OF_RANGE");
        }
        if self.flow.voice_countdown_secs == 0 {
            errors.add_error("flow.voice_countdown_secs", "must be positive", "OUT_OF_RANGE");
        }
        if self.flow.tick_interval_ms == 0 {
            errors.add_error("flow.tick_interval_ms", "must be positive", "OUT_OF_RANGE");
        }
        if self.flow.request_timeout_secs == Some(0) {
            errors.add_error("flow.request_timeout_secs", "must be positive", "OUT_OF_RANGE");
        }
        if !validators::is_valid_url(&self.otp_service.base_url) {
            errors.add_error("otp_service.base_url", "must be an http(s) URL", "INVALID_URL");
        }
        if self.otp_service.timeout_secs == 0 {
            errors.add_error("otp_service.timeout_secs", "must be positive", "OUT_OF_RANGE");
        }
        if !validators::not_empty(&self.otp_service.voice_method) {
            errors.add_error("otp_service.voice_method", "must not be empty", "REQUIRED");
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(AppConfig::for_environment(Environment::Production).validate().is_ok());
    }

    #[test]
    fn test_invalid_config_reports_fields() {
        let mut config = AppConfig::default();
        config.flow.country_code = "91".to_string();
        config.flow.tick_interval_ms = 0;
        config.otp_service.base_url = "ftp://example".to_string();

        let errors = config.validate().unwrap_err();
        let fields = errors.to_field_errors();
        assert!(fields.contains_key("flow.country_code"));
        assert!(fields.contains_key("flow.tick_interval_ms"));
        assert!(fields.contains_key("otp_service.base_url"));
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn test_production_defaults_use_http_provider() {
        let config = AppConfig::for_environment(Environment::Production);
        assert_eq!(config.otp_service.provider, OtpProvider::Http);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_development_defaults_use_mock_provider() {
        let config = AppConfig::for_environment(Environment::Development);
        assert_eq!(config.otp_service.provider, OtpProvider::Mock);
        assert_eq!(config.flow.sms_countdown_secs, 30);
    }
}
