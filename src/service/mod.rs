//! Worker contract and construction.
//!
//! # Data Flow
//! ```text
//! ShortenerConfig + ServiceDependencies
//!     → registry.rs (one builder per logical worker name)
//!     → Vec<Arc<dyn Service>> (disabled builders produce nothing)
//!     → handed to the supervisor, which owns them until shutdown
//! ```
//!
//! # Design Decisions
//! - One worker contract: name, start (blocks for the worker's lifetime), stop
//! - Capabilities are declared by registration, never probed at runtime
//! - A failed build pass stops everything it already built

pub mod registry;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::BoxError;

pub use registry::{RegistryError, ServiceBuilder, ServiceDependencies, ServiceRegistry};

/// A long-running unit owned by the supervisor.
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique name within one supervisor.
    fn name(&self) -> &str;

    /// Run until `token` is cancelled or the worker fails.
    ///
    /// Returning `Err` while the supervisor is running triggers a full shutdown.
    async fn start(&self, token: CancellationToken) -> Result<(), BoxError>;

    /// Ask the worker to stop and wait until it has.
    ///
    /// `deadline` fires when the caller stops waiting; implementations should
    /// give up on graceful work at that point. Calling `stop` more than once,
    /// or on a worker that never started, must succeed.
    async fn stop(&self, deadline: CancellationToken) -> Result<(), BoxError>;
}
