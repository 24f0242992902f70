//! OTP Service Module
//!
//! This module provides the collaborators the verification flow sends codes
//! through and checks codes with.
//!
//! ## Features
//!
//! - **HTTP Provider**: Form-encoded calls to the hosted OTP function
//! - **Mock Implementation**: In-process codes for development
//! - **Security**: Phone number masking in logs, constant-time code comparison

use std::sync::Arc;

use otp_core::services::verification::{CodeDeliveryService, CodeVerificationService};
use otp_shared::config::{Environment, OtpProvider, OtpServiceConfig};

pub mod http_client;
pub mod mock_otp;

pub use http_client::HttpOtpClient;
pub use mock_otp::{MockOtpService, MOCK_REJECTION_STATUS};

use crate::InfrastructureError;

#[cfg(test)]
mod tests;

/// Delivery and verification halves of one provider
#[derive(Clone)]
pub struct OtpServices {
    pub delivery: Arc<dyn CodeDeliveryService>,
    pub verifier: Arc<dyn CodeVerificationService>,
    /// Name of the provider, for logs and the demo banner
    pub provider: &'static str,
}

impl std::fmt::Debug for OtpServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpServices")
            .field("provider", &self.provider)
            .finish()
    }
}

impl OtpServices {
    /// Both halves backed by the same provider instance
    pub fn from_provider<P>(provider: Arc<P>, name: &'static str) -> Self
    where
        P: CodeDeliveryService + CodeVerificationService + 'static,
    {
        Self {
            delivery: provider.clone(),
            verifier: provider,
            provider: name,
        }
    }
}

/// Create the OTP services named by configuration
///
/// The mock provider logs generated codes outside production.
///
/// # Arguments
///
/// * `config` - OTP provider configuration
/// * `environment` - Deployment environment
pub fn create_otp_services(
    config: &OtpServiceConfig,
    environment: Environment,
) -> Result<OtpServices, InfrastructureError> {
    match config.provider {
        OtpProvider::Http => {
            let client = HttpOtpClient::new(config.clone())?;
            Ok(OtpServices::from_provider(Arc::new(client), "http"))
        }
        OtpProvider::Mock => {
            if environment.is_production() {
                tracing::warn!("Mock OTP provider configured in production");
            }
            let mock = MockOtpService::with_code_logging(environment.allows_code_logging());
            Ok(OtpServices::from_provider(Arc::new(mock), "mock"))
        }
    }
}
