//! Traits for the external OTP delivery and verification services

use async_trait::async_trait;

use crate::domain::entities::Channel;
use crate::errors::ServiceError;

use super::types::ServiceReply;

/// Sends a one-time code to a phone number
#[async_trait]
pub trait CodeDeliveryService: Send + Sync {
    /// Request delivery of a fresh code over `channel`
    ///
    /// `phone` carries the country prefix. `Ok` with `success: false` means the
    /// service answered but refused; `Err` means no usable answer arrived.
    async fn send(&self, phone: &str, channel: Channel) -> Result<ServiceReply, ServiceError>;
}

/// Checks a code entered by the operator
#[async_trait]
pub trait CodeVerificationService: Send + Sync {
    async fn verify(&self, phone: &str, code: &str) -> Result<ServiceReply, ServiceError>;
}
