//! Verification session entity: the state of one phone-number verification attempt.
//!
//! The entity only knows how to apply transitions to itself. Sequencing,
//! collaborator calls, and timers live in the flow controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::CodeDigits;
use crate::errors::{ErrorKind, FlowError};

/// Delivery channel of the one-time code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Voice,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Voice => "voice",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level state of the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    AwaitingPhone,
    AwaitingCode,
    Verifying,
    Verified,
}

/// Outcome of the most recent code verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Idle,
    Submitting,
    Verified,
    Rejected,
    Error,
}

/// Result of applying one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Countdown decremented and still positive
    Running(u32),
    /// Countdown reached zero on this tick
    Expired,
    /// Nothing to count down
    Idle,
}

/// Snapshot-able state of one verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Unique identifier of the session
    pub id: Uuid,

    pub phase: FlowPhase,

    /// Phone number with country prefix, set once the code was requested
    pub phone_number: Option<String>,

    /// Masked hint of the phone number for display
    pub phone_hint: Option<String>,

    pub channel: Channel,

    pub code_digits: CodeDigits,

    /// Seconds left before fallback/resend becomes available
    pub countdown: u32,

    /// Voice fallback may be requested (SMS only)
    pub fallback_offered: bool,

    pub resend_available: bool,

    pub verification_status: VerificationStatus,

    /// A phone-number submission is outstanding
    pub submitting: bool,

    pub last_error: Option<ErrorKind>,

    pub last_error_message: Option<String>,

    pub started_at: DateTime<Utc>,

    pub verified_at: Option<DateTime<Utc>>,
}

impl Default for VerificationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationSession {
    /// A fresh session waiting for a phone number
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: FlowPhase::AwaitingPhone,
            phone_number: None,
            phone_hint: None,
            channel: Channel::Sms,
            code_digits: CodeDigits::new(),
            countdown: 0,
            fallback_offered: false,
            resend_available: false,
            verification_status: VerificationStatus::Idle,
            submitting: false,
            last_error: None,
            last_error_message: None,
            started_at: Utc::now(),
            verified_at: None,
        }
    }

    /// The first code was sent by SMS; start collecting digits
    pub fn begin_code_entry(&mut self, phone_number: String, phone_hint: String, countdown: u32) {
        self.phase = FlowPhase::AwaitingCode;
        self.phone_number = Some(phone_number);
        self.phone_hint = Some(phone_hint);
        self.channel = Channel::Sms;
        self.code_digits.clear();
        self.countdown = countdown;
        self.fallback_offered = false;
        self.resend_available = false;
        self.verification_status = VerificationStatus::Idle;
        self.submitting = false;
        self.clear_error();
    }

    /// Apply one countdown tick
    ///
    /// Ticks only count while the operator is in the code step. Reaching zero offers
    /// resend on every channel and the voice fallback on SMS.
    pub fn tick(&mut self) -> CountdownTick {
        let counting = matches!(self.phase, FlowPhase::AwaitingCode | FlowPhase::Verifying);
        if !counting || self.countdown == 0 {
            return CountdownTick::Idle;
        }

        self.countdown -= 1;
        if self.countdown > 0 {
            return CountdownTick::Running(self.countdown);
        }

        self.resend_available = true;
        if self.channel == Channel::Sms {
            self.fallback_offered = true;
        }
        CountdownTick::Expired
    }

    pub fn can_switch_to_voice(&self) -> bool {
        self.phase == FlowPhase::AwaitingCode
            && self.channel == Channel::Sms
            && self.fallback_offered
    }

    /// Move to the voice channel; returns `false` when the fallback is not on offer
    pub fn switch_to_voice(&mut self, countdown: u32) -> bool {
        if !self.can_switch_to_voice() {
            return false;
        }
        self.channel = Channel::Voice;
        self.restart(countdown);
        true
    }

    pub fn can_resend(&self) -> bool {
        self.phase == FlowPhase::AwaitingCode && self.resend_available
    }

    /// Start over on the current channel; returns `false` when resend is not on offer
    pub fn resend(&mut self, countdown: u32) -> bool {
        if !self.can_resend() {
            return false;
        }
        self.restart(countdown);
        true
    }

    fn restart(&mut self, countdown: u32) {
        self.code_digits.clear();
        self.countdown = countdown;
        self.fallback_offered = false;
        self.resend_available = false;
        self.verification_status = VerificationStatus::Idle;
        self.clear_error();
    }

    pub fn begin_verification(&mut self) {
        self.phase = FlowPhase::Verifying;
        self.verification_status = VerificationStatus::Submitting;
        self.clear_error();
    }

    pub fn mark_verified(&mut self) {
        self.phase = FlowPhase::Verified;
        self.verification_status = VerificationStatus::Verified;
        self.fallback_offered = false;
        self.resend_available = false;
        self.verified_at = Some(Utc::now());
        self.clear_error();
    }

    /// Back to code entry after the verifier rejected the code or was unreachable
    ///
    /// A rejection empties the slots; an unreachable verifier keeps them so the
    /// operator can resubmit without retyping.
    pub fn verification_failed(&mut self, error: &FlowError) {
        self.phase = FlowPhase::AwaitingCode;
        if error.kind() == ErrorKind::InvalidCode {
            self.code_digits.clear();
        }
        self.record_error(error);
    }

    /// Show `error` as the single visible message
    pub fn record_error(&mut self, error: &FlowError) {
        match error.kind() {
            ErrorKind::InvalidCode => self.verification_status = VerificationStatus::Rejected,
            ErrorKind::VerificationUnavailable => {
                self.verification_status = VerificationStatus::Error
            }
            ErrorKind::InvalidPhoneFormat | ErrorKind::DeliveryUnavailable => {}
        }
        self.last_error = Some(error.kind());
        self.last_error_message = Some(error.message().to_string());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
        self.last_error_message = None;
        if matches!(
            self.verification_status,
            VerificationStatus::Rejected | VerificationStatus::Error
        ) {
            self.verification_status = VerificationStatus::Idle;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == FlowPhase::Verified
    }
}
