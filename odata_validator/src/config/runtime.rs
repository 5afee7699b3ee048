// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPreferences {
    /// Whether to emit a success event for every query that passes
    pub log_passes: bool,

    /// Whether to emit a debug event for every filter node visited
    pub trace_filter_nodes: bool,

    /// Whether failure events carry the offending option/operator/function as context
    pub include_violation_context: bool,

    /// Whether rejections are logged at all; off when the caller reports them itself
    pub log_rejections: bool,
}

impl Default for ValidationPreferences {
    fn default() -> Self {
        Self {
            log_passes: env::var(env_vars::VALIDATION_LOG_PASSES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            trace_filter_nodes: env::var(env_vars::VALIDATION_TRACE_FILTER_NODES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            include_violation_context: env::var(env_vars::VALIDATION_INCLUDE_CONTEXT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            log_rejections: env::var(env_vars::VALIDATION_LOG_REJECTIONS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging (user preference)
    pub use_structured_logging: bool,

    /// Whether to enable console output (user preference)
    pub enable_console_logging: bool,

    /// User preferred minimum log level (within security constraints)
    /// Note: internal validation failures are still logged regardless of this setting
    pub min_log_level: LogLevel,

    /// Whether to tag events with the current request context
    pub include_request_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var(env_vars::LOGGING_ENABLE_CONSOLE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Warning),
            include_request_context: env::var(env_vars::LOGGING_INCLUDE_REQUEST_CONTEXT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel for compatibility
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Validation
    pub const VALIDATION_LOG_PASSES: &str = "ODATA_VALIDATION_LOG_PASSES";
    pub const VALIDATION_TRACE_FILTER_NODES: &str = "ODATA_VALIDATION_TRACE_FILTER_NODES";
    pub const VALIDATION_INCLUDE_CONTEXT: &str = "ODATA_VALIDATION_INCLUDE_CONTEXT";
    pub const VALIDATION_LOG_REJECTIONS: &str = "ODATA_VALIDATION_LOG_REJECTIONS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "ODATA_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "ODATA_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "ODATA_LOGGING_MIN_LEVEL";
    pub const LOGGING_INCLUDE_REQUEST_CONTEXT: &str = "ODATA_LOGGING_INCLUDE_REQUEST_CONTEXT";
}
