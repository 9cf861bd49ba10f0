//! Structured Logging
//!
//! `tracing` subscriber setup plus a structured record for settlement
//! outcomes, so log aggregation can count absorbed and failed events.
//!
//! # Usage
//!
//! ```rust,ignore
//! use onchain_settlement::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?; // JSON mode for production
//! ```

use serde::Serialize;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::settlement::EventKind;

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// UTXO events
    Chain,
    /// Payout lifecycle events
    Payout,
    /// Consumer start and run summaries
    System,
    Error,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

/// Log the result of handling one chain event
///
/// `outcome` is "applied", "absorbed", "ignored" or "failed".
pub fn log_settlement_event(
    kind: EventKind,
    sequence: u64,
    outcome: &str,
    correlation_id: Option<&str>,
    error: Option<(&str, &str)>,
) {
    let (level, category) = match (error.is_some(), kind.is_payout()) {
        (true, _) => (LogLevel::Error, EventCategory::Error),
        (false, true) => (LogLevel::Info, EventCategory::Payout),
        (false, false) => (LogLevel::Info, EventCategory::Chain),
    };

    let mut event = LogEvent::new(level, category, format!("{} {}", kind, outcome)).with_data(
        serde_json::json!({
            "sequence": sequence,
            "kind": kind.as_str(),
            "outcome": outcome,
        }),
    );
    if let Some(id) = correlation_id {
        event = event.with_correlation_id(id);
    }
    if let Some((code, message)) = error {
        event = event.with_error(code, message);
    }

    if level == LogLevel::Error {
        tracing::error!(target: "settlement::consumer", "{}", event.to_json());
    } else {
        tracing::info!(target: "settlement::consumer", "{}", event.to_json());
    }
}

/// Log a consumer lifecycle record (start, run summary)
pub fn log_system_event(message: &str, correlation_id: &str, data: serde_json::Value) {
    let event = LogEvent::new(LogLevel::Info, EventCategory::System, message)
        .with_correlation_id(correlation_id)
        .with_data(data);
    tracing::info!(target: "settlement::consumer", "{}", event.to_json());
}

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "onchain_settlement={lvl},settlement={lvl}",
            lvl = level.as_filter()
        ))
    });

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from SettlementConfig
pub fn init_from_config(config: &super::config::SettlementConfig) -> Result<(), LoggingError> {
    init_logging(LogLevel::from(config.log_level.as_str()), config.log_json)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a correlation ID for a consumer run
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
