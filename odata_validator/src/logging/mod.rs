//! Global logging module for the OData validator
//!
//! Provides thread-safe global logging with per-request context tagging
//! and a small macro interface. Nothing is emitted until
//! `init_global_logging` has been called, so the validator can be embedded
//! without any logging setup.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

// Re-export main types
pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{
    ConsoleLogger, Logger, LoggingService, MemoryLogger, MultiLogger, StructuredLogger,
};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

thread_local! {
    static REQUEST_CONTEXT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Identifies the query currently being validated on this thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging system
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Configuration validation failed: {}", e))?;

    let logging_service = Arc::new(service::create_configured_service());

    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| "Global logger already initialized")?;

    // Validate error code system
    let required_codes = [
        codes::system::INTERNAL_ERROR,
        codes::options::OPTION_NOT_ALLOWED,
        codes::filter::UNSUPPORTED_NODE,
        codes::limits::TOP_EXCEEDS_MAXIMUM,
    ];
    for code in required_codes {
        if codes::get_description(code.as_str()) == "Unknown error" {
            let message = format!("Missing metadata for error code: {}", code);
            logging_service.log_error(codes::system::INITIALIZATION_FAILURE, &message);
            return Err(message);
        }
    }

    logging_service.log_success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    );

    Ok(())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

// ============================================================================
// REQUEST CONTEXT MANAGEMENT
// ============================================================================

/// Set request context for current thread
pub fn set_request_context(request_id: impl Into<String>) {
    let context = RequestContext::new(request_id);
    REQUEST_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = Some(context);
    });
}

/// Clear request context for current thread
pub fn clear_request_context() {
    REQUEST_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = None;
    });
}

/// Execute function with request context, restoring the previous context afterwards
pub fn with_request_context<F, R>(request_id: impl Into<String>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = get_current_request_context();
    set_request_context(request_id);
    let result = f();
    REQUEST_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = previous;
    });
    result
}

/// Get current request context (used by macros)
pub fn get_current_request_context() -> Option<RequestContext> {
    REQUEST_CONTEXT.with(|ctx| ctx.borrow().clone())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

fn attach_context(mut event: LogEvent, context: Vec<(&str, &str)>) -> LogEvent {
    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if config::include_request_context() {
        if let Some(request) = get_current_request_context() {
            event = event.with_context("request", &request.request_id);
        }
    }

    event
}

/// Log error with context (used by log_error! macro)
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(attach_context(LogEvent::error(code, message), context));
    }
}

/// Log warning with context (used by log_warning! macro)
pub fn log_warning_with_context(code: Option<Code>, message: &str, context: Vec<(&str, &str)>) {
    if let Some(logger) = try_get_global_logger() {
        let event = match code {
            Some(code) => LogEvent::warning_with_code(code, message),
            None => LogEvent::warning(message),
        };
        logger.log_event(attach_context(event, context));
    }
}

/// Log success with context (used by log_success! macro)
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(attach_context(LogEvent::success(code, message), context));
    }
}

/// Log info with context (used by log_info! macro)
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(attach_context(LogEvent::info(message), context));
    }
}

/// Log debug with context (used by log_debug! macro)
pub fn log_debug_with_context(message: &str, context: Vec<(&str, &str)>) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(attach_context(LogEvent::debug(message), context));
    }
}

/// Whether a debug event would reach any logger
pub fn debug_enabled() -> bool {
    try_get_global_logger()
        .map(|logger| logger.should_log(LogLevel::Debug))
        .unwrap_or(false)
}

/// Get system diagnostics
pub fn get_system_diagnostics() -> String {
    let mut diagnostics = String::new();

    diagnostics.push_str("=== Logging System Diagnostics ===\n");
    diagnostics.push_str(&format!("Initialized: {}\n", is_initialized()));
    diagnostics.push_str(&format!(
        "Config source: {}\n",
        crate::config::build_info::source_info()
    ));
    diagnostics.push('\n');
    diagnostics.push_str(&config::get_config_summary());

    diagnostics
}

/// Safe error logging (won't panic if uninitialized)
pub fn safe_log_error(code: Code, message: &str) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(LogEvent::error(code, message));
    } else {
        eprintln!("[ERROR] FALLBACK: [{}] {}", code.as_str(), message);
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================

/// Shared in-memory global logger for unit tests.
///
/// The global logger can only be installed once per process, so every test
/// that inspects emitted events goes through this helper and filters by its
/// own request id.
#[cfg(test)]
pub(crate) fn test_memory_logger() -> Arc<MemoryLogger> {
    static MEMORY: OnceLock<Arc<MemoryLogger>> = OnceLock::new();

    MEMORY
        .get_or_init(|| {
            let memory = service::create_test_logger();
            let service = LoggingService::new(memory.clone(), LogLevel::Debug);
            if GLOBAL_LOGGER.set(Arc::new(service)).is_err() {
                panic!("test logger must be the first global logger");
            }
            memory
        })
        .clone()
}

/// Events captured by the shared test logger for one request id
#[cfg(test)]
pub(crate) fn test_events_for(request_id: &str) -> Vec<LogEvent> {
    test_memory_logger()
        .get_events()
        .into_iter()
        .filter(|e| e.context.get("request").map(String::as_str) == Some(request_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_management() {
        assert!(get_current_request_context().is_none());

        set_request_context("req-1");
        assert_eq!(
            get_current_request_context(),
            Some(RequestContext::new("req-1"))
        );

        clear_request_context();
        assert!(get_current_request_context().is_none());
    }

    #[test]
    fn test_with_request_context_nests() {
        let result = with_request_context("outer", || {
            with_request_context("inner", || {
                assert_eq!(get_current_request_context().unwrap().request_id, "inner");
            });
            assert_eq!(get_current_request_context().unwrap().request_id, "outer");
            42
        });

        assert_eq!(result, 42);
        assert!(get_current_request_context().is_none());
    }

    #[test]
    fn test_events_tagged_with_request() {
        test_memory_logger();

        with_request_context("logging-mod-tag", || {
            log_warning_with_context(
                Some(codes::options::OPTION_NOT_ALLOWED),
                "rejected",
                vec![("option", "top")],
            );
        });

        let events = test_events_for("logging-mod-tag");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code, codes::options::OPTION_NOT_ALLOWED);
        assert_eq!(events[0].context.get("option").unwrap(), "top");
    }

    #[test]
    fn test_safe_logging() {
        safe_log_error(codes::system::INTERNAL_ERROR, "Test error");
    }

    #[test]
    fn test_diagnostics() {
        let diagnostics = get_system_diagnostics();
        assert!(diagnostics.contains("Logging System Diagnostics"));
        assert!(diagnostics.contains("Config source"));
    }
}
