//! Worker registry: builds every configured worker in one pass.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use sqlx::PgPool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ShortenerConfig;
use crate::service::Service;
use crate::BoxError;

/// Shared collaborators handed to every builder.
#[derive(Clone)]
pub struct ServiceDependencies {
    pub config: Arc<ShortenerConfig>,
    /// Present when the database init step ran.
    pub db: Option<PgPool>,
}

impl ServiceDependencies {
    pub fn new(config: Arc<ShortenerConfig>, db: Option<PgPool>) -> Self {
        Self { config, db }
    }
}

/// Produces one worker, keyed by a logical name.
pub trait ServiceBuilder: Send + Sync {
    /// Logical name; must equal the built worker's [`Service::name`].
    fn name(&self) -> &'static str;

    /// Build the worker, or `Ok(None)` when its feature is disabled.
    fn build(&self, deps: &ServiceDependencies) -> Result<Option<Arc<dyn Service>>, BoxError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to build {builder} service: {source}")]
    Build {
        builder: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("builder {builder} produced a worker named {worker}")]
    NameMismatch { builder: &'static str, worker: String },

    #[error("worker {0} registered twice")]
    Duplicate(String),
}

/// Ordered set of builders.
pub struct ServiceRegistry {
    builders: Vec<Box<dyn ServiceBuilder>>,
    rollback_timeout: Duration,
}

impl ServiceRegistry {
    /// Empty registry; `rollback_timeout` bounds the cleanup of a failed pass.
    pub fn new(rollback_timeout: Duration) -> Self {
        Self {
            builders: Vec::new(),
            rollback_timeout,
        }
    }

    /// Registry with every worker this daemon ships.
    pub fn standard(config: &ShortenerConfig) -> Self {
        Self::new(config.shutdown.timeout()).register(crate::http::api::WebBuilder)
    }

    pub fn register(mut self, builder: impl ServiceBuilder + 'static) -> Self {
        self.builders.push(Box::new(builder));
        self
    }

    /// Builder names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.builders.iter().map(|b| b.name()).collect()
    }

    /// Run every builder in order.
    ///
    /// On the first failure, every worker built so far in this pass is
    /// stopped before the error is returned.
    pub async fn build(
        &self,
        deps: &ServiceDependencies,
    ) -> Result<Vec<Arc<dyn Service>>, RegistryError> {
        let mut built: Vec<Arc<dyn Service>> = Vec::with_capacity(self.builders.len());

        for builder in &self.builders {
            let outcome = match builder.build(deps) {
                Ok(Some(svc)) if svc.name() != builder.name() => Err(RegistryError::NameMismatch {
                    builder: builder.name(),
                    worker: svc.name().to_string(),
                }),
                Ok(Some(svc)) if built.iter().any(|b| b.name() == svc.name()) => {
                    Err(RegistryError::Duplicate(svc.name().to_string()))
                }
                Ok(Some(svc)) => {
                    tracing::debug!(worker = builder.name(), "Worker built");
                    built.push(svc);
                    Ok(())
                }
                Ok(None) => {
                    tracing::info!(worker = builder.name(), "Worker disabled by configuration");
                    Ok(())
                }
                Err(source) => Err(RegistryError::Build {
                    builder: builder.name(),
                    source,
                }),
            };

            if let Err(e) = outcome {
                tracing::error!(error = %e, rollback = built.len(), "Worker build failed");
                self.rollback(&built).await;
                return Err(e);
            }
        }

        Ok(built)
    }

    async fn rollback(&self, built: &[Arc<dyn Service>]) {
        if built.is_empty() {
            return;
        }

        let deadline = CancellationToken::new();
        let timer = {
            let deadline = deadline.clone();
            let timeout = self.rollback_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline.cancel();
            })
        };

        let stops = built.iter().map(|svc| {
            let deadline = deadline.clone();
            async move {
                if let Err(e) = svc.stop(deadline).await {
                    tracing::warn!(worker = svc.name(), error = %e, "Rollback stop failed");
                }
            }
        });
        let _ = tokio::time::timeout(self.rollback_timeout, join_all(stops)).await;
        timer.abort();
    }
}
