//! Error taxonomy of the verification flow.
//!
//! Every [`FlowError`] carries the operator-facing message that the flow records in the
//! session snapshot. [`ServiceError`] describes transport faults of the external
//! collaborators and never reaches the operator directly.

mod types;

pub use types::ServiceError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default operator-facing messages
pub mod messages {
    pub const INVALID_PHONE_FORMAT: &str = "Please enter a valid Indian phone number.";
    pub const DELIVERY_FAILED: &str = "Failed to send OTP. Please try again.";
    pub const DELIVERY_UNREACHABLE: &str = "Network error. Please try again.";
    pub const INVALID_CODE: &str = "Invalid OTP. Please try again.";
    pub const VERIFICATION_UNREACHABLE: &str = "Verification failed. Please try again.";
}

/// Discriminant of a [`FlowError`], stored in the session snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPhoneFormat,
    DeliveryUnavailable,
    InvalidCode,
    VerificationUnavailable,
}

/// Recoverable failures of the verification flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Local validation rejected the phone number; no service was called
    #[error("{message}")]
    InvalidPhoneFormat { phone: String, message: String },

    /// The delivery service refused the request or could not be reached
    #[error("{message}")]
    DeliveryUnavailable { message: String },

    /// The verification service rejected the code
    #[error("{message}")]
    InvalidCode { message: String },

    /// The verification service could not be reached
    #[error("{message}")]
    VerificationUnavailable { message: String },
}

impl FlowError {
    pub fn invalid_phone(phone: impl Into<String>) -> Self {
        FlowError::InvalidPhoneFormat {
            phone: phone.into(),
            message: messages::INVALID_PHONE_FORMAT.to_string(),
        }
    }

    /// Delivery service answered `success: false`
    pub fn delivery_rejected(status: Option<String>) -> Self {
        FlowError::DeliveryUnavailable {
            message: status_or(status, messages::DELIVERY_FAILED),
        }
    }

    /// Delivery service could not be reached at all
    pub fn delivery_unreachable() -> Self {
        FlowError::DeliveryUnavailable {
            message: messages::DELIVERY_UNREACHABLE.to_string(),
        }
    }

    /// Verification service answered `success: false`
    pub fn code_rejected(status: Option<String>) -> Self {
        FlowError::InvalidCode {
            message: status_or(status, messages::INVALID_CODE),
        }
    }

    /// Verification service could not be reached at all
    pub fn verification_unreachable() -> Self {
        FlowError::VerificationUnavailable {
            message: messages::VERIFICATION_UNREACHABLE.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::InvalidPhoneFormat { .. } => ErrorKind::InvalidPhoneFormat,
            FlowError::DeliveryUnavailable { .. } => ErrorKind::DeliveryUnavailable,
            FlowError::InvalidCode { .. } => ErrorKind::InvalidCode,
            FlowError::VerificationUnavailable { .. } => ErrorKind::VerificationUnavailable,
        }
    }

    /// Operator-facing message
    pub fn message(&self) -> &str {
        match self {
            FlowError::InvalidPhoneFormat { message, .. }
            | FlowError::DeliveryUnavailable { message }
            | FlowError::InvalidCode { message }
            | FlowError::VerificationUnavailable { message } => message,
        }
    }
}

fn status_or(status: Option<String>, default: &str) -> String {
    status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub type FlowResult<T> = Result<T, FlowError>;
