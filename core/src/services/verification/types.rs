//! Types exchanged with the external OTP services

use serde::{Deserialize, Serialize};

/// Answer of the delivery or verification service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceReply {
    pub success: bool,
    /// Human-readable status, shown to the operator on failure when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ServiceReply {
    pub fn accepted() -> Self {
        Self {
            success: true,
            status: None,
        }
    }

    pub fn refused(status: impl Into<String>) -> Self {
        Self {
            success: false,
            status: Some(status.into()),
        }
    }

    /// Refusal without a status text
    pub fn refused_silently() -> Self {
        Self::default()
    }
}
