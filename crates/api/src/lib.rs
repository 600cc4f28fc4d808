//! HTTP API: configuration, server wiring, and request/response mapping.

pub mod app;
pub mod config;

pub use config::{ApiConfig, ConfigError, QueueBackend};
