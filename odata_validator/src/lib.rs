// Internal modules
pub mod config;
#[macro_use]
pub mod logging;
pub mod query;
pub mod settings;
pub mod validation;

// Re-export key types for library consumers
pub use query::{ExpressionNode, FilterClause, ParsedQuery, QueryOption, RawQueryOptions};
pub use settings::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, AllowedQueryOptions,
    SettingsError, ValidationSettings,
};
pub use validation::{validate_query, QueryValidator, ValidationError, ValidationResult};
