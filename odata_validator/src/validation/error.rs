//! Validation error types with global logging integration

use crate::config::runtime::ValidationPreferences;
use crate::logging::codes;
use crate::query::QueryOption;
use crate::{log_error, log_warning};
use std::fmt;
use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Which allow-list an operator is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorClass {
    Logical,
    Arithmetic,
}

impl OperatorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logical => "logical",
            Self::Arithmetic => "arithmetic",
        }
    }
}

impl fmt::Display for OperatorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// First policy violation (or unsupported input) found in a query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The '{}' query option is not allowed.", option.name())]
    OptionNotAllowed { option: QueryOption },

    #[error("The '{operator}' {class} operator is not allowed.")]
    OperatorNotAllowed {
        operator: String,
        class: OperatorClass,
    },

    #[error("The '{function}' function is not allowed.")]
    FunctionNotAllowed { function: String },

    #[error("The $skip query option value {value} exceeded the MaxSkip value {max}.")]
    SkipExceedsMaximum { value: i64, max: i64 },

    #[error("The $top query option value {value} exceeded the MaxTop value {max}.")]
    TopExceedsMaximum { value: i64, max: i64 },

    #[error("Validation of the '{kind}' query node is not supported.")]
    UnsupportedNode { kind: String },

    #[error("The $filter expression reached depth {depth}, exceeding the maximum of {max}.")]
    ExpressionTooComplex { depth: usize, max: usize },
}

impl ValidationError {
    pub fn option_not_allowed(option: QueryOption) -> Self {
        Self::OptionNotAllowed { option }
    }

    pub fn logical_operator_not_allowed(operator: &str) -> Self {
        Self::OperatorNotAllowed {
            operator: operator.to_string(),
            class: OperatorClass::Logical,
        }
    }

    pub fn arithmetic_operator_not_allowed(operator: &str) -> Self {
        Self::OperatorNotAllowed {
            operator: operator.to_string(),
            class: OperatorClass::Arithmetic,
        }
    }

    pub fn function_not_allowed(function: &str) -> Self {
        Self::FunctionNotAllowed {
            function: function.to_string(),
        }
    }

    pub fn unsupported_node(kind: &str) -> Self {
        Self::UnsupportedNode {
            kind: kind.to_string(),
        }
    }

    pub fn expression_too_complex(depth: usize, max: usize) -> Self {
        Self::ExpressionTooComplex { depth, max }
    }

    /// Get appropriate error code for logging system
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::OptionNotAllowed { .. } => codes::options::OPTION_NOT_ALLOWED,
            Self::OperatorNotAllowed { .. } => codes::filter::OPERATOR_NOT_ALLOWED,
            Self::FunctionNotAllowed { .. } => codes::filter::FUNCTION_NOT_ALLOWED,
            Self::SkipExceedsMaximum { .. } => codes::limits::SKIP_EXCEEDS_MAXIMUM,
            Self::TopExceedsMaximum { .. } => codes::limits::TOP_EXCEEDS_MAXIMUM,
            Self::UnsupportedNode { .. } => codes::filter::UNSUPPORTED_NODE,
            Self::ExpressionTooComplex { .. } => codes::filter::EXPRESSION_TOO_COMPLEX,
        }
    }

    /// Get error type for context
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::OptionNotAllowed { .. } => "OptionNotAllowed",
            Self::OperatorNotAllowed { .. } => "OperatorNotAllowed",
            Self::FunctionNotAllowed { .. } => "FunctionNotAllowed",
            Self::SkipExceedsMaximum { .. } => "SkipExceedsMaximum",
            Self::TopExceedsMaximum { .. } => "TopExceedsMaximum",
            Self::UnsupportedNode { .. } => "UnsupportedNode",
            Self::ExpressionTooComplex { .. } => "ExpressionTooComplex",
        }
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }

    /// The query asked for something the policy forbids
    pub fn is_policy_violation(&self) -> bool {
        !self.is_internal()
    }

    /// The validator could not judge the query (unknown node, runaway nesting)
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedNode { .. } | Self::ExpressionTooComplex { .. }
        )
    }

    /// Offending values as log context
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::OptionNotAllowed { option } => vec![("option", option.to_string())],
            Self::OperatorNotAllowed { operator, class } => vec![
                ("operator", operator.clone()),
                ("class", class.to_string()),
            ],
            Self::FunctionNotAllowed { function } => vec![("function", function.clone())],
            Self::SkipExceedsMaximum { value, max } | Self::TopExceedsMaximum { value, max } => {
                vec![("value", value.to_string()), ("max", max.to_string())]
            }
            Self::UnsupportedNode { kind } => vec![("kind", kind.clone())],
            Self::ExpressionTooComplex { depth, max } => {
                vec![("depth", depth.to_string()), ("max", max.to_string())]
            }
        }
    }

    /// Emit this error to the global logger.
    ///
    /// Policy violations go out as coded warnings; internal failures go out as
    /// errors so they stand apart from ordinary rejections.
    pub(crate) fn report(self, preferences: &ValidationPreferences) -> Self {
        if !preferences.log_rejections {
            return self;
        }

        let message = self.to_string();
        let details = if preferences.include_violation_context {
            self.context()
                .into_iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            String::new()
        };

        if self.is_internal() {
            log_error!(self.error_code(), &message,
                "error_type" => self.error_type(),
                "severity" => self.severity(),
                "details" => details
            );
        } else {
            log_warning!(code = self.error_code(), &message,
                "error_type" => self.error_type(),
                "details" => details
            );
        }

        self
    }
}
