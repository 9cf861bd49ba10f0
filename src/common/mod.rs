//! Common Infrastructure Module
//!
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - Application error type

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, Network, SettlementConfig};
pub use error::{AppError, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_settlement_event,
    log_system_event, EventCategory, LogEvent, LogLevel, LoggingError,
};
