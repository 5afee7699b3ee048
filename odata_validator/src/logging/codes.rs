//! Consolidated error codes and classification system
//!
//! Single source of truth for every code the validator emits, together with
//! the behavioral metadata consumers use to triage events.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Query option allow-list codes
pub mod options {
    use super::Code;

    pub const OPTION_NOT_ALLOWED: Code = Code::new("E300");
}

/// $filter expression codes
pub mod filter {
    use super::Code;

    pub const OPERATOR_NOT_ALLOWED: Code = Code::new("E310");
    pub const FUNCTION_NOT_ALLOWED: Code = Code::new("E311");
    pub const UNSUPPORTED_NODE: Code = Code::new("E350");
    pub const EXPRESSION_TOO_COMPLEX: Code = Code::new("E351");
}

/// $skip / $top ceiling codes
pub mod limits {
    use super::Code;

    pub const SKIP_EXCEEDS_MAXIMUM: Code = Code::new("E320");
    pub const TOP_EXCEEDS_MAXIMUM: Code = Code::new("E321");
}

/// Settings loading codes
pub mod settings {
    use super::Code;

    pub const SETTINGS_READ_ERROR: Code = Code::new("E330");
    pub const SETTINGS_PARSE_ERROR: Code = Code::new("E331");
}

/// Query document loading codes
pub mod input {
    use super::Code;

    pub const QUERY_READ_ERROR: Code = Code::new("E340");
    pub const QUERY_PARSE_ERROR: Code = Code::new("E341");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const QUERY_VALIDATION_PASSED: Code = Code::new("I300");
    pub const FILTER_VALIDATION_PASSED: Code = Code::new("I310");
    pub const SETTINGS_LOADED: Code = Code::new("I330");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::new();

        let entries = [
            // System errors
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Critical internal system error",
                "Contact system administrator or file bug report",
            ),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "System initialization failure",
                "Check logging configuration and environment variables",
            ),
            // Policy violations
            ErrorMetadata::new(
                "E300",
                "Policy",
                Severity::Low,
                true,
                false,
                "Query option is not in the allowed set",
                "Remove the query option or allow it in the validation settings",
            ),
            ErrorMetadata::new(
                "E310",
                "Policy",
                Severity::Low,
                true,
                false,
                "Operator in $filter is not in the allowed set",
                "Rewrite the filter without the operator or allow it in the validation settings",
            ),
            ErrorMetadata::new(
                "E311",
                "Policy",
                Severity::Low,
                true,
                false,
                "Function in $filter is not in the allowed set",
                "Rewrite the filter without the function or allow it in the validation settings",
            ),
            ErrorMetadata::new(
                "E320",
                "Policy",
                Severity::Low,
                true,
                false,
                "$skip value exceeds the configured maximum",
                "Request a smaller $skip value",
            ),
            ErrorMetadata::new(
                "E321",
                "Policy",
                Severity::Low,
                true,
                false,
                "$top value exceeds the configured maximum",
                "Request a smaller page with $top",
            ),
            // Settings errors
            ErrorMetadata::new(
                "E330",
                "Settings",
                Severity::High,
                false,
                true,
                "Validation settings file could not be read",
                "Check the settings path and file permissions",
            ),
            ErrorMetadata::new(
                "E331",
                "Settings",
                Severity::High,
                false,
                true,
                "Validation settings file is not valid",
                "Fix the TOML syntax or the option/operator/function names",
            ),
            // Input errors
            ErrorMetadata::new(
                "E340",
                "Input",
                Severity::Medium,
                true,
                false,
                "Query document could not be read",
                "Check the query path and file permissions",
            ),
            ErrorMetadata::new(
                "E341",
                "Input",
                Severity::Medium,
                true,
                false,
                "Query document is not a valid parsed query",
                "Regenerate the query document from the upstream parser",
            ),
            // Internal validator errors
            ErrorMetadata::new(
                "E350",
                "Internal",
                Severity::High,
                true,
                false,
                "Expression tree contains a node kind the validator does not support",
                "Upgrade the validator or reject the query upstream",
            ),
            ErrorMetadata::new(
                "E351",
                "Security",
                Severity::High,
                true,
                false,
                "Expression tree nesting exceeds the configured depth",
                "Simplify the filter or raise max_expression_depth",
            ),
            // Success codes
            ErrorMetadata::new(
                "I004",
                "System",
                Severity::Low,
                true,
                false,
                "Logging system initialized",
                "No action required",
            ),
            ErrorMetadata::new(
                "I300",
                "Validation",
                Severity::Low,
                true,
                false,
                "Query passed validation",
                "No action required",
            ),
            ErrorMetadata::new(
                "I310",
                "Validation",
                Severity::Low,
                true,
                false,
                "$filter expression passed validation",
                "No action required",
            ),
            ErrorMetadata::new(
                "I330",
                "Settings",
                Severity::Low,
                true,
                false,
                "Validation settings loaded",
                "No action required",
            ),
        ];

        for metadata in entries {
            registry.insert(metadata.code, metadata);
        }

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific error code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from error code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for error code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for error code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get error category from error code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
