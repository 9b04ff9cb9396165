//! URL shortener daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ app (init steps) ──▶ service registry ──▶ supervisor
//!                  │                                        │
//!                  ├─ logging / metrics                      ├─ workers (web, health listener)
//!                  ├─ health monitor ◀── checkers            ├─ health evaluator
//!                  └─ database pool ── background connect    └─ signals / failures → shutdown
//! ```
//!
//! The supervisor owns cancellation. Workers, checkers and the background
//! connect task only observe it.

pub mod app;
pub mod config;
pub mod database;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod service;

/// Error type crossing the worker and checker seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use app::{App, BootOptions};
pub use config::ShortenerConfig;
pub use lifecycle::{Supervisor, SupervisorError};
pub use service::Service;
