//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Boot-time dependency connect:
//!     → backoff.rs (attempt, sleep with growing jittered delay)
//!     → overall deadline reached: permanent failure, no further attempts
//! ```
//!
//! # Design Decisions
//! - Every retry loop has a wall-clock budget
//! - Jitter spreads reconnect storms across instances
//! - Retrying stops as soon as shutdown is requested

pub mod backoff;

pub use backoff::{calculate_backoff, retry_with_deadline, BackoffPolicy, RetryError};
