//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Boot (append-before-run):
//!     add_checker() / add_gate() on a &mut HealthMonitor
//!     → monitor moved behind Arc, set frozen
//!
//! Evaluation (monitor.rs):
//!     Wait for startup gates (bounded by grace)
//!     → Periodic timer
//!     → Run every checker concurrently, each under a timeout
//!     → Build snapshot.rs value, swap it in, set readiness
//!     → Count outcomes per checker
//!
//! Exposure (crate::http::health):
//!     /health → 503 unless healthy
//!     /ready  → 503 only while starting
//! ```
//!
//! # Design Decisions
//! - Single writer (the evaluator), any number of lock-free readers
//! - Readers always see a complete snapshot, never a partial one
//! - Dependency failures are never fatal; they only show up here and in metrics

pub mod checker;
pub mod gate;
pub mod monitor;
pub mod snapshot;

pub use checker::DependencyChecker;
pub use gate::{startup_gate, GateOpener, StartupGate};
pub use monitor::{HealthError, HealthMonitor};
pub use snapshot::{CheckStatus, CheckerStatus, OverallStatus, StatusSnapshot};
