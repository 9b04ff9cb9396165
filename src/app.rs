//! Daemon bootstrap.
//!
//! # Data Flow
//! ```text
//! ShortenerConfig
//!     → init steps: logger → metrics → health → database
//!     → ServiceRegistry::standard (web, ...)
//!     → health listener added as a worker
//!     → Supervisor (Booting)
//! App::run → Supervisor::run under the instance span
//! ```

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ShortenerConfig;
use crate::database::{self, dsn, spawn_connect, DatabaseChecker};
use crate::health::{startup_gate, HealthMonitor};
use crate::http::health::{self as health_http, HealthState};
use crate::http::HttpServer;
use crate::lifecycle::{BootError, FailureReporter, InitPipeline, Supervisor, SupervisorError};
use crate::observability::logging::{self, Instance};
use crate::observability::metrics;
use crate::resilience::BackoffPolicy;
use crate::service::{ServiceDependencies, ServiceRegistry};

/// Process-global side effects performed during boot.
#[derive(Debug, Clone, Copy)]
pub struct BootOptions {
    /// Install the global tracing subscriber.
    pub install_logger: bool,
    /// Install the global metrics recorder; otherwise a detached one is used.
    pub install_metrics: bool,
    /// Let the supervisor react to SIGTERM/SIGINT.
    pub handle_signals: bool,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            install_logger: true,
            install_metrics: true,
            handle_signals: true,
        }
    }
}

struct BootContext {
    config: Arc<ShortenerConfig>,
    options: BootOptions,
    metrics: Option<PrometheusHandle>,
    health: Option<HealthMonitor>,
    db: Option<PgPool>,
    failures: FailureReporter,
    token: CancellationToken,
}

fn boot_pipeline() -> InitPipeline<BootContext> {
    InitPipeline::new()
        .step("logger", |ctx: &mut BootContext| {
            if ctx.options.install_logger {
                logging::init(&ctx.config.logging)?;
            }
            Ok(())
        })
        .step("metrics", |ctx| {
            if !ctx.config.metrics.enabled {
                tracing::info!("Metrics disabled");
                return Ok(());
            }
            let handle = if ctx.options.install_metrics {
                metrics::install()?
            } else {
                metrics::detached_handle()?
            };
            ctx.metrics = Some(handle);
            Ok(())
        })
        .step("health", |ctx| {
            ctx.health = Some(HealthMonitor::from_config(&ctx.config.health));
            Ok(())
        })
        .step("database", |ctx| {
            let config = &ctx.config.database;
            if !config.enabled {
                tracing::info!("Database disabled");
                return Ok(());
            }

            let dsn = dsn::from_env()?;
            let pool = database::lazy_pool(config, &dsn)?;
            let health = ctx.health.as_mut().ok_or("health monitor not initialized")?;
            health.add_checker(Arc::new(DatabaseChecker::new(pool.clone())))?;

            let (opener, gate) = startup_gate("database");
            health.add_gate(gate);

            let policy = BackoffPolicy::new(
                config.initial_backoff(),
                config.max_backoff(),
                config.connect_timeout(),
            );
            spawn_connect(
                pool.clone(),
                policy,
                opener,
                ctx.failures.clone(),
                ctx.token.clone(),
            );
            ctx.db = Some(pool);
            Ok(())
        })
}

/// A fully booted daemon, ready to run.
pub struct App {
    instance: Instance,
    health_server: Arc<HttpServer>,
    supervisor: Supervisor,
}

impl App {
    pub async fn new(config: ShortenerConfig) -> Result<Self, BootError> {
        Self::with_options(config, BootOptions::default()).await
    }

    pub async fn with_options(
        config: ShortenerConfig,
        options: BootOptions,
    ) -> Result<Self, BootError> {
        let config = Arc::new(config);
        let instance = Instance::from_env(&config.app);
        let builder = Supervisor::builder()
            .shutdown_timeout(config.shutdown.timeout())
            .handle_signals(options.handle_signals);

        let mut ctx = BootContext {
            config: config.clone(),
            options,
            metrics: None,
            health: None,
            db: None,
            failures: builder.reporter(),
            token: builder.child_token(),
        };
        boot_pipeline().run(&mut ctx)?;

        let deps = ServiceDependencies::new(config.clone(), ctx.db.clone());
        let workers = match ServiceRegistry::standard(&config).build(&deps).await {
            Ok(w) => w,
            Err(e) => {
                ctx.token.cancel();
                return Err(e.into());
            }
        };

        let monitor = Arc::new(
            ctx.health
                .take()
                .unwrap_or_else(|| HealthMonitor::from_config(&config.health)),
        );
        let health_server = Arc::new(health_http::server(
            &config.health,
            HealthState {
                monitor: monitor.clone(),
                metrics: ctx.metrics.clone(),
            },
        ));

        let supervisor = builder
            .workers(workers)
            .worker(health_server.clone())
            .health(monitor)
            .build()
            .map_err(|e| {
                ctx.token.cancel();
                BootError::from(e)
            })?;

        tracing::info!(
            system = %instance.system,
            version = %instance.version,
            workers = ?supervisor.worker_names(),
            "Boot complete"
        );

        Ok(Self {
            instance,
            health_server,
            supervisor,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// The health listener, e.g. to learn its bound address.
    pub fn health_server(&self) -> Arc<HttpServer> {
        self.health_server.clone()
    }

    /// Run until shutdown; cancelling `token` requests a clean stop.
    pub async fn run(self, token: CancellationToken) -> Result<(), SupervisorError> {
        let span = self.instance.span();
        self.supervisor.run(token).instrument(span).await
    }
}
