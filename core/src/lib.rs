//! # StayRealtor OTP Core
//!
//! Domain layer and flow controller for phone-number verification by one-time code.
//! This crate contains the session entity, the error taxonomy, the collaborator
//! traits for code delivery and verification, and the countdown-driven flow that
//! ties them together. Rendering is left to the embedding presentation layer.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
