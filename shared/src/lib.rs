//! Shared utilities and common types for the StayRealtor OTP workspace
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration types (environment, logging, flow timing, OTP provider)
//! - Utility functions (phone normalization and masking, validation)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, Environment, FlowSettings, LogFormat, LoggingConfig, OtpProvider,
    OtpServiceConfig,
};
pub use utils::{phone, validation};
