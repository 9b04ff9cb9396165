//! Database connectivity.
//!
//! # Data Flow
//! ```text
//! Environment → dsn.rs (DB_DSN, or composed from DB_* variables)
//!     → lazy sqlx pool (no I/O at boot)
//!     → checker.rs registered with the health monitor
//!     → connectivity.rs pings in the background under backoff
//! ```
//!
//! Queries belong to the workers that need them; this module only owns the
//! pool and its liveness.

pub mod checker;
pub mod connectivity;
pub mod dsn;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::BoxError;

pub use checker::DatabaseChecker;
pub use connectivity::spawn_connect;
pub use dsn::DsnError;

/// Build the pool without connecting.
pub fn lazy_pool(config: &DatabaseConfig, dsn: &str) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_lazy(dsn)?;
    Ok(pool)
}
