//! Services containing the verification flow and its collaborator seams.

pub mod verification;

// Re-export commonly used types
pub use verification::{
    CodeDeliveryService, CodeVerificationService, CountdownScheduler, FlowConfig,
    ManualScheduler, ServiceReply, TimerHandle, TokioScheduler, VerificationFlow,
};
