use async_trait::async_trait;
use sqlx::{Connection, PgPool};
use tokio_util::sync::CancellationToken;

use crate::health::DependencyChecker;
use crate::BoxError;

/// Reports the database as down unless a pooled connection answers a ping.
pub struct DatabaseChecker {
    pool: PgPool,
}

impl DatabaseChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyChecker for DatabaseChecker {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self, token: CancellationToken) -> Result<(), BoxError> {
        tokio::select! {
            res = ping(&self.pool) => res.map_err(Into::into),
            _ = token.cancelled() => Err("check cancelled".into()),
        }
    }
}

/// Acquire a connection and round-trip a ping on it.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}
