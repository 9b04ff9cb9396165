//! Startup orchestration.
//!
//! # Responsibilities
//! - Run named boot steps in registration order
//! - Stop at the first failing step and name it in the error
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order, not concurrently; a step that needs to wait on I/O
//!   spawns that work and hands back a startup gate instead of blocking

use thiserror::Error;

use crate::lifecycle::supervisor::SupervisorError;
use crate::service::RegistryError;
use crate::BoxError;

/// Errors that keep the process from reaching `Running`.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to initialize {step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

type StepFn<C> = Box<dyn FnOnce(&mut C) -> Result<(), BoxError> + Send>;

/// Ordered list of boot steps sharing a mutable context.
pub struct InitPipeline<C> {
    steps: Vec<(&'static str, StepFn<C>)>,
}

impl<C> InitPipeline<C> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step; steps run in the order they were added.
    pub fn step<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: FnOnce(&mut C) -> Result<(), BoxError> + Send + 'static,
    {
        self.steps.push((name, Box::new(run)));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|(name, _)| *name).collect()
    }

    /// Run every step against `ctx`, aborting on the first error.
    pub fn run(self, ctx: &mut C) -> Result<(), BootError> {
        for (step, run) in self.steps {
            tracing::debug!(step, "Running init step");
            if let Err(source) = run(ctx) {
                tracing::error!(step, error = %source, "Init step failed");
                return Err(BootError::Step { step, source });
            }
        }
        Ok(())
    }
}

impl<C> Default for InitPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}
