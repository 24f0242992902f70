//! Domain entities.

pub mod verification_session;

#[cfg(test)]
mod tests;

pub use verification_session::{
    Channel, CountdownTick, FlowPhase, VerificationSession, VerificationStatus,
};
