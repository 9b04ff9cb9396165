//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (bind, shared middleware, graceful drain)
//!     → request.rs (request ID set/propagate)
//!     → middleware/ (request metrics)
//!     → health.rs (/health, /ready, /metrics) or api.rs (public routes)
//! ```
//!
//! Every listener is a [`crate::service::Service`] owned by the supervisor.

pub mod api;
pub mod health;
pub mod middleware;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError, ServerPhase};
