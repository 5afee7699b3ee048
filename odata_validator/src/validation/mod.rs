//! Query option validation
//!
//! Checks a [`ParsedQuery`] against [`ValidationSettings`]: every present
//! option must be allowed, the $filter tree must only use allowed operators
//! and functions, and $skip / $top must stay under their ceilings. Checking
//! stops at the first violation.

pub mod error;
pub mod filter;
pub mod functions;
pub mod limits;

pub use error::{OperatorClass, ValidationError, ValidationResult};
pub use filter::{validate_filter, validate_node, FilterValidator};
pub use functions::function_flag;
pub use limits::{validate_skip, validate_top};

use crate::config::runtime::ValidationPreferences;
use crate::logging::codes;
use crate::query::{ParsedQuery, QueryOption};
use crate::settings::ValidationSettings;
use crate::{log_debug, log_success};
use std::sync::OnceLock;

static PREFERENCES: OnceLock<ValidationPreferences> = OnceLock::new();

/// Install validation preferences for the process.
///
/// Falls back to environment-derived defaults if never called; fails if the
/// preferences were already installed or already read.
pub fn init_validation_preferences(preferences: ValidationPreferences) -> Result<(), String> {
    PREFERENCES
        .set(preferences)
        .map_err(|_| "Validation preferences already initialized".to_string())
}

pub(crate) fn preferences() -> &'static ValidationPreferences {
    PREFERENCES.get_or_init(ValidationPreferences::default)
}

/// Stateless validator; one instance can serve any number of requests
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryValidator;

impl QueryValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, query: &ParsedQuery, settings: &ValidationSettings) -> ValidationResult<()> {
        validate_query_with(query, settings, preferences())
    }
}

/// Validate every present option of `query` against `settings`
pub fn validate_query(query: &ParsedQuery, settings: &ValidationSettings) -> ValidationResult<()> {
    QueryValidator::new().validate(query, settings)
}

fn validate_query_with(
    query: &ParsedQuery,
    settings: &ValidationSettings,
    preferences: &ValidationPreferences,
) -> ValidationResult<()> {
    let present = query.present_options();
    log_debug!("Validating query options", "present" => present.len());

    for option in &present {
        if !settings.allowed_query_options.contains(option.flag()) {
            return Err(ValidationError::option_not_allowed(*option).report(preferences));
        }

        match option {
            QueryOption::Filter => {
                if let Some(filter) = &query.filter {
                    FilterValidator::new(settings)
                        .with_preferences(preferences)
                        .validate(filter)?;
                }
            }
            QueryOption::Skip => {
                if let Some(skip) = query.skip {
                    limits::validate_skip_with(skip, settings, preferences)?;
                }
            }
            QueryOption::Top => {
                if let Some(top) = query.top {
                    limits::validate_top_with(top, settings, preferences)?;
                }
            }
            // Allowed and carried; nothing further to inspect
            _ => {}
        }
    }

    if preferences.log_passes {
        let options = present
            .iter()
            .map(QueryOption::key)
            .collect::<Vec<_>>()
            .join(",");
        log_success!(codes::success::QUERY_VALIDATION_PASSED, "Query passed validation",
            "options" => options
        );
    }

    Ok(())
}
