//! HTTP OTP Service Implementation
//!
//! Talks to a hosted OTP function with form-encoded POSTs:
//!
//! - `send`: fields `phone` and `method` (`sms`, or the configured voice method)
//! - `verify`: fields `phone` and `code`
//!
//! Both endpoints answer with JSON carrying at least `success` and optionally a
//! human-readable `status`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

use otp_core::domain::Channel;
use otp_core::errors::ServiceError;
use otp_core::services::verification::{
    CodeDeliveryService, CodeVerificationService, ServiceReply,
};
use otp_shared::config::OtpServiceConfig;
use otp_shared::phone::mask_phone_number;

use crate::InfrastructureError;

/// Client for the hosted OTP send/verify endpoints
#[derive(Debug, Clone)]
pub struct HttpOtpClient {
    client: Client,
    config: OtpServiceConfig,
}

impl HttpOtpClient {
    /// Create a new client for the endpoints in `config`
    pub fn new(config: OtpServiceConfig) -> Result<Self, InfrastructureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "HTTP OTP client initialized"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OtpServiceConfig {
        &self.config
    }

    /// Value of the `method` form field for `channel`
    pub fn wire_method(&self, channel: Channel) -> &str {
        match channel {
            Channel::Sms => "sms",
            Channel::Voice => &self.config.voice_method,
        }
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<ServiceReply, ServiceError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(url = url, status = %status, "OTP service answered");
        parse_reply(status, &body)
    }

    fn transport_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            ServiceError::Unreachable(error.to_string())
        }
    }
}

/// Interpret a response body
///
/// Any JSON body with a `success` field is an answer, whatever the HTTP status.
/// A successful status with an unreadable body is malformed; an error status
/// with an unreadable body counts as the service being unavailable.
pub(crate) fn parse_reply(status: StatusCode, body: &str) -> Result<ServiceReply, ServiceError> {
    match serde_json::from_str::<ServiceReply>(body) {
        Ok(reply) => Ok(reply),
        Err(e) if status.is_success() => Err(ServiceError::MalformedResponse(e.to_string())),
        Err(_) => Err(ServiceError::Unreachable(format!("HTTP {}", status))),
    }
}

#[async_trait]
impl CodeDeliveryService for HttpOtpClient {
    async fn send(&self, phone: &str, channel: Channel) -> Result<ServiceReply, ServiceError> {
        let method = self.wire_method(channel);
        let reply = self
            .post_form(&self.config.send_url(), &[("phone", phone), ("method", method)])
            .await?;

        if reply.success {
            info!(
                phone = %mask_phone_number(phone),
                method = method,
                status = ?reply.status,
                "OTP sent"
            );
        } else {
            warn!(
                phone = %mask_phone_number(phone),
                method = method,
                status = ?reply.status,
                "OTP service refused to send"
            );
        }
        Ok(reply)
    }
}

#[async_trait]
impl CodeVerificationService for HttpOtpClient {
    async fn verify(&self, phone: &str, code: &str) -> Result<ServiceReply, ServiceError> {
        let reply = self
            .post_form(&self.config.verify_url(), &[("phone", phone), ("code", code)])
            .await?;

        if !reply.success {
            warn!(
                phone = %mask_phone_number(phone),
                status = ?reply.status,
                "OTP service rejected code"
            );
        }
        Ok(reply)
    }
}
