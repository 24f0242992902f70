//! In-process OTP provider for development and tests
//!
//! Generates a fresh six-digit code per delivery and remembers the latest one per
//! phone number. Nothing leaves the process; when code logging is enabled the code
//! is written to the log so a developer can type it in.

use async_trait::async_trait;
use constant_time_eq::constant_time_eq;
use rand::{rngs::OsRng, Rng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use otp_core::domain::{Channel, CODE_LENGTH};
use otp_core::errors::ServiceError;
use otp_core::services::verification::{
    CodeDeliveryService, CodeVerificationService, ServiceReply,
};
use otp_shared::phone::mask_phone_number;

/// Status reported when a code does not match
pub const MOCK_REJECTION_STATUS: &str = "Invalid OTP";

/// Mock OTP service with switchable failure modes
#[derive(Debug, Default)]
pub struct MockOtpService {
    codes: Mutex<HashMap<String, String>>,
    deliveries: Mutex<Vec<(String, Channel)>>,
    refuse_delivery: AtomicBool,
    unreachable: AtomicBool,
    log_codes: bool,
}

impl MockOtpService {
    /// Create a mock that keeps generated codes out of the log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that logs every generated code
    pub fn with_code_logging(log_codes: bool) -> Self {
        Self {
            log_codes,
            ..Self::default()
        }
    }

    /// Make deliveries answer `success: false`
    pub fn set_refuse_delivery(&self, refuse: bool) {
        self.refuse_delivery.store(refuse, Ordering::SeqCst);
    }

    /// Make every call fail as a transport fault
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Latest code delivered to `phone` and not yet used
    pub fn last_code(&self, phone: &str) -> Option<String> {
        lock(&self.codes).get(phone).cloned()
    }

    /// Every delivery so far, oldest first
    pub fn deliveries(&self) -> Vec<(String, Channel)> {
        lock(&self.deliveries).clone()
    }

    /// Generate a uniformly distributed six-digit code with the OS CSPRNG
    pub fn generate_code() -> String {
        let code: u32 = OsRng.gen_range(0..1_000_000);
        format!("{:0width$}", code, width = CODE_LENGTH)
    }

    fn check_reachable(&self) -> Result<(), ServiceError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(ServiceError::Unreachable("mock OTP service offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CodeDeliveryService for MockOtpService {
    async fn send(&self, phone: &str, channel: Channel) -> Result<ServiceReply, ServiceError> {
        self.check_reachable()?;
        lock(&self.deliveries).push((phone.to_string(), channel));

        if self.refuse_delivery.load(Ordering::SeqCst) {
            warn!(phone = %mask_phone_number(phone), "Mock OTP delivery refused");
            return Ok(ServiceReply::refused("Mock delivery disabled"));
        }

        let code = Self::generate_code();
        if self.log_codes {
            info!(
                phone = %mask_phone_number(phone),
                channel = %channel,
                code = %code,
                "Mock OTP generated"
            );
        } else {
            info!(phone = %mask_phone_number(phone), channel = %channel, "Mock OTP generated");
        }
        lock(&self.codes).insert(phone.to_string(), code);

        Ok(ServiceReply {
            success: true,
            status: Some("pending".to_string()),
        })
    }
}

#[async_trait]
impl CodeVerificationService for MockOtpService {
    async fn verify(&self, phone: &str, code: &str) -> Result<ServiceReply, ServiceError> {
        self.check_reachable()?;

        let mut codes = lock(&self.codes);
        let matches = codes
            .get(phone)
            .map(|expected| {
                expected.len() == code.len() && constant_time_eq(expected.as_bytes(), code.as_bytes())
            })
            .unwrap_or(false);

        if matches {
            codes.remove(phone);
            Ok(ServiceReply {
                success: true,
                status: Some("approved".to_string()),
            })
        } else {
            Ok(ServiceReply::refused(MOCK_REJECTION_STATUS))
        }
    }
}
