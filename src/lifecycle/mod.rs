//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Named init steps, in order → first failure aborts boot
//!
//! Run (supervisor.rs):
//!     Spawn workers + health evaluator
//!     → wait for first failure (failure.rs), parent cancellation or signal
//!     → cancel the token once
//!
//! Shutdown (shutdown.rs):
//!     Stop every worker concurrently → Closer waits, bounded by the deadline
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, metrics, health, database
//! - Cancellation has one owner; everyone else only observes it
//! - Shutdown has a deadline: the process exits even if a worker hangs

pub mod failure;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use failure::{failure_channel, FailureReporter, WorkerFailure};
pub use shutdown::{CloseError, Closer};
pub use startup::{BootError, InitPipeline};
pub use supervisor::{
    StopErrors, Supervisor, SupervisorBuilder, SupervisorError, SupervisorState,
};
