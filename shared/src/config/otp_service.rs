//! OTP provider configuration

use serde::{Deserialize, Serialize};

/// Hosted OTP endpoint used by the original web client
pub const DEFAULT_OTP_BASE_URL: &str = "https://stayrealtor-otp-9582.twil.io";

/// Which implementation backs the delivery and verification services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpProvider {
    /// Form-encoded HTTP calls to a hosted OTP function
    Http,
    /// In-process generator, for development and tests
    #[default]
    Mock,
}

/// Configuration of the external OTP service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpServiceConfig {
    /// Provider implementation
    #[serde(default)]
    pub provider: OtpProvider,

    /// Base URL of the OTP service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the send endpoint
    #[serde(default = "default_send_path")]
    pub send_path: String,

    /// Path of the verify endpoint
    #[serde(default = "default_verify_path")]
    pub verify_path: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Value of the `method` form field for voice delivery
    #[serde(default = "default_voice_method")]
    pub voice_method: String,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            provider: OtpProvider::default(),
            base_url: default_base_url(),
            send_path: default_send_path(),
            verify_path: default_verify_path(),
            timeout_secs: default_timeout(),
            voice_method: default_voice_method(),
        }
    }
}

impl OtpServiceConfig {
    /// Configuration for the HTTP provider at the given base URL
    pub fn http(base_url: impl Into<String>) -> Self {
        Self {
            provider: OtpProvider::Http,
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full URL of the send endpoint
    pub fn send_url(&self) -> String {
        join_url(&self.base_url, &self.send_path)
    }

    /// Full URL of the verify endpoint
    pub fn verify_url(&self) -> String {
        join_url(&self.base_url, &self.verify_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_base_url() -> String {
    String::from(DEFAULT_OTP_BASE_URL)
}

fn default_send_path() -> String {
    String::from("/send-otp")
}

fn default_verify_path() -> String {
    String::from("/verify-otp")
}

fn default_timeout() -> u64 {
    15
}

fn default_voice_method() -> String {
    String::from("call")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let config = OtpServiceConfig::default();
        assert_eq!(config.provider, OtpProvider::Mock);
        assert_eq!(
            config.send_url(),
            "https://stayrealtor-otp-9582.twil.io/send-otp"
        );
        assert_eq!(
            config.verify_url(),
            "https://stayrealtor-otp-9582.twil.io/verify-otp"
        );
        assert_eq!(config.voice_method, "call");
    }

    #[test]
    fn test_missing_provider_falls_back_to_mock() {
        assert_eq!(OtpProvider::default(), OtpProvider::Mock);
        let config: OtpServiceConfig =
            serde_json::from_str(r#"{"base_url": "http://localhost:9000"}"#).unwrap();
        assert_eq!(config.provider, OtpProvider::Mock);
    }

    #[test]
    fn test_url_join_tolerates_slashes() {
        let mut config = OtpServiceConfig::http("http://localhost:8080/");
        config.send_path = "send".to_string();
        assert_eq!(config.provider, OtpProvider::Http);
        assert_eq!(config.send_url(), "http://localhost:8080/send");
        assert_eq!(config.verify_url(), "http://localhost:8080/verify-otp");
    }
}
