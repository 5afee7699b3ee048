//! Validation policy: which options, operators and functions a query may use
//!
//! A [`ValidationSettings`] value is built once per endpoint, either through
//! [`ValidationSettingsBuilder`] or from a TOML document, and then shared
//! read-only across every validation call.

pub mod flags;

pub use flags::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, AllowedQueryOptions,
};

use crate::config::compile_time::filter::MAX_EXPRESSION_DEPTH;
use crate::logging::codes;
use crate::validation::filter::DEPTH_CEILING;
use crate::{log_error, log_success};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Immutable validation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub allowed_arithmetic_operators: AllowedArithmeticOperators,
    pub allowed_functions: AllowedFunctions,
    pub allowed_logical_operators: AllowedLogicalOperators,
    pub allowed_query_options: AllowedQueryOptions,
    /// Inclusive ceiling for $skip; `None` means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_skip: Option<i64>,
    /// Inclusive ceiling for $top; `None` means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_top: Option<i64>,
    /// Deepest $filter tree accepted, counting the root as depth 1
    pub max_expression_depth: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            allowed_arithmetic_operators: AllowedArithmeticOperators::ALL,
            allowed_functions: AllowedFunctions::ALL_FUNCTIONS,
            allowed_logical_operators: AllowedLogicalOperators::ALL,
            allowed_query_options: AllowedQueryOptions::ALL,
            max_skip: None,
            max_top: None,
            max_expression_depth: MAX_EXPRESSION_DEPTH,
        }
    }
}

impl ValidationSettings {
    pub fn builder() -> ValidationSettingsBuilder {
        ValidationSettingsBuilder::default()
    }

    /// Depth the $filter walker actually enforces
    pub fn effective_max_depth(&self) -> usize {
        self.max_expression_depth.min(DEPTH_CEILING)
    }

    /// Parse settings from a TOML document; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::parse_error(None, &e.to_string()))
    }

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| {
            let error = SettingsError::Io {
                path: path.to_path_buf(),
                source,
            };
            log_error!(error.error_code(), "Failed to read validation settings",
                "path" => path.display(),
                "error" => &error
            );
            error
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| {
            let error = SettingsError::parse_error(Some(path), &e.to_string());
            log_error!(error.error_code(), "Invalid validation settings",
                "path" => path.display(),
                "error" => &error
            );
            error
        })?;

        log_success!(codes::success::SETTINGS_LOADED, "Validation settings loaded",
            "path" => path.display(),
            "query_options" => settings.allowed_query_options,
            "max_top" => format!("{:?}", settings.max_top),
            "max_skip" => format!("{:?}", settings.max_skip)
        );

        Ok(settings)
    }

    /// Render settings as TOML
    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        toml::to_string(self).map_err(|e| SettingsError::Serialize {
            message: e.to_string(),
        })
    }
}

/// Consuming builder for [`ValidationSettings`]
#[derive(Debug, Clone, Default)]
pub struct ValidationSettingsBuilder {
    settings: ValidationSettings,
}

impl ValidationSettingsBuilder {
    pub fn allow_query_options(mut self, options: AllowedQueryOptions) -> Self {
        self.settings.allowed_query_options = options;
        self
    }

    pub fn allow_logical_operators(mut self, operators: AllowedLogicalOperators) -> Self {
        self.settings.allowed_logical_operators = operators;
        self
    }

    pub fn allow_arithmetic_operators(mut self, operators: AllowedArithmeticOperators) -> Self {
        self.settings.allowed_arithmetic_operators = operators;
        self
    }

    pub fn allow_functions(mut self, functions: AllowedFunctions) -> Self {
        self.settings.allowed_functions = functions;
        self
    }

    pub fn max_skip(mut self, max: i64) -> Self {
        self.settings.max_skip = Some(max);
        self
    }

    pub fn max_top(mut self, max: i64) -> Self {
        self.settings.max_top = Some(max);
        self
    }

    pub fn max_expression_depth(mut self, depth: usize) -> Self {
        self.settings.max_expression_depth = depth;
        self
    }

    pub fn build(self) -> ValidationSettings {
        self.settings
    }
}

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid validation settings{}: {}", display_location(path), message)]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Failed to serialize validation settings: {message}")]
    Serialize { message: String },
}

fn display_location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl SettingsError {
    pub fn parse_error(path: Option<&Path>, message: &str) -> Self {
        Self::Parse {
            path: path.map(Path::to_path_buf),
            message: message.to_string(),
        }
    }

    /// Get appropriate error code for logging system
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::Io { .. } => codes::settings::SETTINGS_READ_ERROR,
            Self::Parse { .. } => codes::settings::SETTINGS_PARSE_ERROR,
            Self::Serialize { .. } => codes::system::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_allow_everything() {
        let settings = ValidationSettings::default();

        assert_eq!(settings.allowed_query_options, AllowedQueryOptions::ALL);
        assert_eq!(settings.allowed_logical_operators, AllowedLogicalOperators::ALL);
        assert_eq!(
            settings.allowed_arithmetic_operators,
            AllowedArithmeticOperators::ALL
        );
        assert_eq!(settings.allowed_functions, AllowedFunctions::ALL_FUNCTIONS);
        assert_eq!(settings.max_skip, None);
        assert_eq!(settings.max_top, None);
        assert_eq!(settings.max_expression_depth, MAX_EXPRESSION_DEPTH);
    }

    #[test]
    fn test_builder() {
        let settings = ValidationSettings::builder()
            .allow_query_options(AllowedQueryOptions::FILTER | AllowedQueryOptions::TOP)
            .allow_functions(AllowedFunctions::ALL_STRING_FUNCTIONS)
            .max_top(100)
            .max_expression_depth(8)
            .build();

        assert!(settings
            .allowed_query_options
            .contains(AllowedQueryOptions::TOP));
        assert!(!settings
            .allowed_query_options
            .contains(AllowedQueryOptions::SKIP));
        assert_eq!(settings.max_top, Some(100));
        assert_eq!(settings.max_skip, None);
        assert_eq!(settings.max_expression_depth, 8);
        assert_eq!(settings.effective_max_depth(), 8);

        let unbounded = ValidationSettings::builder()
            .max_expression_depth(usize::MAX)
            .build();
        assert_eq!(unbounded.effective_max_depth(), DEPTH_CEILING);
    }

    #[test]
    fn test_from_toml_partial_document() {
        let settings = ValidationSettings::from_toml_str(
            r#"
            allowed_query_options = ["filter", "order_by", "top"]
            allowed_functions = ["starts_with", "contains_not_a_name"]
            "#,
        );
        assert_matches!(settings, Err(SettingsError::Parse { path: None, .. }));

        let settings = ValidationSettings::from_toml_str(
            r#"
            allowed_query_options = ["filter", "order_by", "top"]
            allowed_logical_operators = ["and", "equal"]
            max_top = 50
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.allowed_query_options,
            AllowedQueryOptions::FILTER | AllowedQueryOptions::ORDER_BY | AllowedQueryOptions::TOP
        );
        assert_eq!(settings.max_top, Some(50));
        assert_eq!(settings.allowed_functions, AllowedFunctions::ALL_FUNCTIONS);
    }

    #[test]
    fn test_from_toml_rejects_unknown_fields() {
        let result = ValidationSettings::from_toml_str("max_tpo = 10");
        assert_matches!(result, Err(SettingsError::Parse { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = ValidationSettings::builder()
            .allow_logical_operators(AllowedLogicalOperators::AND | AllowedLogicalOperators::EQUAL)
            .allow_arithmetic_operators(AllowedArithmeticOperators::EMPTY)
            .max_skip(1000)
            .build();

        let rendered = settings.to_toml_string().unwrap();
        assert!(rendered.contains("max_skip = 1000"));
        assert!(!rendered.contains("max_top"));

        let reparsed = ValidationSettings::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, settings);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allowed_query_options = \"all\"").unwrap();
        writeln!(file, "max_top = 25").unwrap();

        let settings = ValidationSettings::load(file.path()).unwrap();
        assert_eq!(settings.max_top, Some(25));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ValidationSettings::load(dir.path().join("missing.toml"));

        let error = result.unwrap_err();
        assert_matches!(error, SettingsError::Io { .. });
        assert_eq!(error.error_code(), codes::settings::SETTINGS_READ_ERROR);
    }

    #[test]
    fn test_settings_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidationSettings>();
    }
}
