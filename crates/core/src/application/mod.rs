// Application Layer - Use Cases and Business Logic

pub mod admission;
pub mod completion;
pub mod panic_guard;
pub mod queue;

// Re-exports
pub use crate::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use admission::{AdmissionOutcome, AdmissionWorker};
pub use completion::{CompletionRequest, CompletionService};
pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use queue::QueueService;
