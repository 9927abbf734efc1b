//! UFDR Ingest Core Library
//!
//! Domain models, error types, and configuration shared across all
//! ufdr-ingest components.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, LogLevel};
