//! Parsed OData query model consumed by the validator
//!
//! A [`ParsedQuery`] is produced upstream by the query-string parser and
//! handed over either as a Rust value or as a JSON document. Every field is
//! present exactly when the corresponding query-string key was present and
//! well formed.

pub mod nodes;
pub mod options;

pub use nodes::{BinaryOperatorKind, ExpressionNode, NodeKind, UnaryOperatorKind};
pub use options::{QueryOption, RawQueryOptions};

use crate::config::compile_time::filter::MAX_EXPRESSION_DEPTH;
use crate::logging::codes;
use crate::validation::filter::DEPTH_CEILING;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parsed $filter clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub expression: ExpressionNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_variable: Option<String>,
}

impl FilterClause {
    pub fn new(expression: ExpressionNode) -> Self {
        Self {
            expression,
            range_variable: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expression: ExpressionNode,
    #[serde(default)]
    pub direction: OrderDirection,
}

/// Parsed $orderby clause (carried, not inspected)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub items: Vec<OrderByItem>,
}

/// Parsed $search clause (carried, not inspected)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClause {
    pub terms: String,
}

/// Parsed $select / $expand clause (carried, not inspected)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectExpandClause {
    pub all_selected: bool,
    pub selected: Vec<String>,
    pub expanded: Vec<String>,
}

/// One request's query options after upstream parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedQuery {
    pub count: Option<bool>,
    pub filter: Option<FilterClause>,
    pub order_by: Option<OrderByClause>,
    pub search: Option<SearchClause>,
    pub select_expand: Option<SelectExpandClause>,
    pub skip: Option<i64>,
    pub top: Option<i64>,
    pub raw: RawQueryOptions,
}

impl ParsedQuery {
    /// Whether the option appeared on the request.
    ///
    /// Options with a parsed slot answer from that slot; `$deltatoken`,
    /// `$format`, `$select`, `$expand` and `$skiptoken` answer from the raw
    /// presence flags.
    pub fn is_present(&self, option: QueryOption) -> bool {
        match option {
            QueryOption::Count => self.count.is_some(),
            QueryOption::Filter => self.filter.is_some(),
            QueryOption::OrderBy => self.order_by.is_some(),
            QueryOption::Search => self.search.is_some(),
            QueryOption::Skip => self.skip.is_some(),
            QueryOption::Top => self.top.is_some(),
            QueryOption::DeltaToken
            | QueryOption::Format
            | QueryOption::Select
            | QueryOption::Expand
            | QueryOption::SkipToken => self.raw.is_present(option),
        }
    }

    /// Options present on the request, in check order
    pub fn present_options(&self) -> Vec<QueryOption> {
        QueryOption::CHECK_ORDER
            .iter()
            .copied()
            .filter(|option| self.is_present(*option))
            .collect()
    }

    pub fn with_filter(mut self, expression: ExpressionNode) -> Self {
        self.filter = Some(FilterClause::new(expression));
        self
    }

    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_top(mut self, top: i64) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_raw(mut self, raw: RawQueryOptions) -> Self {
        self.raw = raw;
        self
    }

    /// Parse a query document, allowing filters up to the compile-time depth
    pub fn from_json_str(content: &str) -> Result<Self, QueryLoadError> {
        Self::from_json_str_within(content, MAX_EXPRESSION_DEPTH)
    }

    /// Parse a query document whose $filter may be up to `max_depth` nodes deep.
    ///
    /// A filter one level deeper still loads so the validator can reject it
    /// with a depth error; documents nested well beyond that are refused
    /// before deserialization.
    pub fn from_json_str_within(content: &str, max_depth: usize) -> Result<Self, QueryLoadError> {
        parse_document(content, max_depth, None)
    }

    /// Load a parsed query document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QueryLoadError> {
        Self::load_within(path, MAX_EXPRESSION_DEPTH)
    }

    /// Load a parsed query document from disk; see [`Self::from_json_str_within`]
    pub fn load_within<P: AsRef<Path>>(path: P, max_depth: usize) -> Result<Self, QueryLoadError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| QueryLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        parse_document(&content, max_depth, Some(path))
    }
}

/// Document levels above the filter root plus room for constant values
const DOCUMENT_NESTING_OVERHEAD: usize = 8;

/// JSON nesting a filter of `max_depth + 1` nodes can reach.
///
/// Each node takes at most two levels: its object and a parameter array.
fn document_nesting_limit(max_depth: usize) -> usize {
    max_depth
        .saturating_add(1)
        .saturating_mul(2)
        .saturating_add(DOCUMENT_NESTING_OVERHEAD)
}

fn parse_document(
    content: &str,
    max_depth: usize,
    path: Option<&Path>,
) -> Result<ParsedQuery, QueryLoadError> {
    let max_depth = max_depth.min(DEPTH_CEILING);
    if nesting_exceeds(content, document_nesting_limit(max_depth)) {
        return Err(QueryLoadError::TooDeep {
            path: path.map(Path::to_path_buf),
            max_depth,
        });
    }

    let parse_error = |e: serde_json::Error| QueryLoadError::Parse {
        path: path.map(Path::to_path_buf),
        message: e.to_string(),
    };

    // Nesting is bounded above, so serde_json's fixed limit is not needed
    let mut deserializer = serde_json::Deserializer::from_str(content);
    deserializer.disable_recursion_limit();
    let query = ParsedQuery::deserialize(&mut deserializer).map_err(parse_error)?;
    deserializer.end().map_err(parse_error)?;

    Ok(query)
}

/// Whether any array or object in `content` nests deeper than `limit`
fn nesting_exceeds(content: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in content.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    false
}

/// Query document loading errors
#[derive(Debug, Error)]
pub enum QueryLoadError {
    #[error("Failed to read query document {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid query document{}: {}", display_location(path), message)]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Query document{} nests deeper than a $filter of depth {} allows", display_location(path), max_depth)]
    TooDeep {
        path: Option<PathBuf>,
        max_depth: usize,
    },
}

fn display_location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

impl QueryLoadError {
    pub fn error_code(&self) -> codes::Code {
        match self {
            Self::Io { .. } => codes::input::QUERY_READ_ERROR,
            Self::Parse { .. } => codes::input::QUERY_PARSE_ERROR,
            Self::TooDeep { .. } => codes::filter::EXPRESSION_TOO_COMPLEX,
        }
    }
}
