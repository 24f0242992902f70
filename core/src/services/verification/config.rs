//! Configuration for the verification flow

use std::time::Duration;

use otp_shared::config::FlowSettings;

use crate::domain::entities::Channel;

/// Timing and numbering plan of a [`VerificationFlow`](super::VerificationFlow)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Country prefix prepended to the subscriber number, e.g. `+91`
    pub country_code: String,
    /// Seconds before the voice fallback is offered on SMS
    pub sms_countdown_secs: u32,
    /// Seconds before resend is offered on voice
    pub voice_countdown_secs: u32,
    /// Period of one countdown tick
    pub tick_interval: Duration,
    /// Upper bound on a single delivery or verification call
    pub request_timeout: Option<Duration>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::from(&FlowSettings::default())
    }
}

impl From<&FlowSettings> for FlowConfig {
    fn from(settings: &FlowSettings) -> Self {
        Self {
            country_code: settings.country_code.clone(),
            sms_countdown_secs: settings.sms_countdown_secs,
            voice_countdown_secs: settings.voice_countdown_secs,
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            request_timeout: settings.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl FlowConfig {
    /// Countdown length for a freshly sent code on `channel`
    pub fn countdown_for(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Sms => self.sms_countdown_secs,
            Channel::Voice => self.voice_countdown_secs,
        }
    }
}
