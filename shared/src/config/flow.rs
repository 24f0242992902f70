//! Verification flow timing configuration

use serde::{Deserialize, Serialize};

/// Timing and numbering-plan settings for the verification flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowSettings {
    /// Country calling code prepended to the subscriber number
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Countdown base for the SMS channel, in seconds
    #[serde(default = "default_sms_countdown")]
    pub sms_countdown_secs: u32,

    /// Countdown base for the voice channel, in seconds
    #[serde(default = "default_voice_countdown")]
    pub voice_countdown_secs: u32,

    /// Period of a single countdown tick, in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Optional upper bound on a single delivery/verification call
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            sms_countdown_secs: default_sms_countdown(),
            voice_countdown_secs: default_voice_countdown(),
            tick_interval_ms: default_tick_interval(),
            request_timeout_secs: None,
        }
    }
}

impl FlowSettings {
    /// Set the per-call request timeout
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }
}

fn default_country_code() -> String {
    String::from("+91")
}

fn default_sms_countdown() -> u32 {
    30
}

fn default_voice_countdown() -> u32 {
    60
}

fn default_tick_interval() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flow_settings() {
        let settings = FlowSettings::default();
        assert_eq!(settings.country_code, "+91");
        assert_eq!(settings.sms_countdown_secs, 30);
        assert_eq!(settings.voice_countdown_secs, 60);
        assert_eq!(settings.tick_interval_ms, 1000);
        assert!(settings.request_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let settings: FlowSettings =
            serde_json::from_str(r#"{"voice_countdown_secs": 90}"#).unwrap();
        assert_eq!(settings.voice_countdown_secs, 90);
        assert_eq!(settings.sms_countdown_secs, 30);
        assert_eq!(settings.country_code, "+91");
    }
}
