//! Verification flow module for phone-number OTP verification
//!
//! This module provides the flow controller and its seams:
//! - Phone submission and first SMS delivery
//! - Digit entry, paste handling, and automatic code submission
//! - Countdown-driven voice fallback and resend
//! - Traits for the delivery and verification services
//! - Injectable countdown scheduler

mod config;
mod flow;
mod scheduler;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::FlowConfig;
pub use flow::VerificationFlow;
pub use scheduler::{
    CountdownScheduler, ManualScheduler, TickControl, TickTask, TimerHandle, TokioScheduler,
};
pub use traits::{CodeDeliveryService, CodeVerificationService};
pub use types::ServiceReply;
