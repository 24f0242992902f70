//! Transport-level faults reported by the external collaborators

use std::time::Duration;
use thiserror::Error;

/// A delivery or verification call that produced no usable answer
///
/// A service that answers `success: false` is not a fault; it is a
/// [`ServiceReply`](crate::services::verification::ServiceReply).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}
