//! System query option keys and raw presence bookkeeping

use crate::settings::AllowedQueryOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The eleven OData system query options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOption {
    Count,
    DeltaToken,
    Format,
    Filter,
    OrderBy,
    Search,
    Select,
    Expand,
    Skip,
    SkipToken,
    Top,
}

impl QueryOption {
    /// Every option in the order the validator checks them
    pub const CHECK_ORDER: [QueryOption; 11] = [
        Self::Count,
        Self::DeltaToken,
        Self::Format,
        Self::Filter,
        Self::OrderBy,
        Self::Search,
        Self::Select,
        Self::Expand,
        Self::Skip,
        Self::SkipToken,
        Self::Top,
    ];

    /// Query-string key, including the `$` prefix
    pub fn key(&self) -> &'static str {
        match self {
            Self::Count => "$count",
            Self::DeltaToken => "$deltatoken",
            Self::Format => "$format",
            Self::Filter => "$filter",
            Self::OrderBy => "$orderby",
            Self::Search => "$search",
            Self::Select => "$select",
            Self::Expand => "$expand",
            Self::Skip => "$skip",
            Self::SkipToken => "$skiptoken",
            Self::Top => "$top",
        }
    }

    /// PascalCase option name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::DeltaToken => "DeltaToken",
            Self::Format => "Format",
            Self::Filter => "Filter",
            Self::OrderBy => "OrderBy",
            Self::Search => "Search",
            Self::Select => "Select",
            Self::Expand => "Expand",
            Self::Skip => "Skip",
            Self::SkipToken => "SkipToken",
            Self::Top => "Top",
        }
    }

    /// Parse a query-string key (case-insensitive, `$` prefix required)
    pub fn parse_key(key: &str) -> Option<Self> {
        Self::CHECK_ORDER
            .iter()
            .copied()
            .find(|option| option.key().eq_ignore_ascii_case(key))
    }

    pub fn flag(&self) -> AllowedQueryOptions {
        match self {
            Self::Count => AllowedQueryOptions::COUNT,
            Self::DeltaToken => AllowedQueryOptions::DELTA_TOKEN,
            Self::Format => AllowedQueryOptions::FORMAT,
            Self::Filter => AllowedQueryOptions::FILTER,
            Self::OrderBy => AllowedQueryOptions::ORDER_BY,
            Self::Search => AllowedQueryOptions::SEARCH,
            Self::Select => AllowedQueryOptions::SELECT,
            Self::Expand => AllowedQueryOptions::EXPAND,
            Self::Skip => AllowedQueryOptions::SKIP,
            Self::SkipToken => AllowedQueryOptions::SKIP_TOKEN,
            Self::Top => AllowedQueryOptions::TOP,
        }
    }
}

impl fmt::Display for QueryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Raw text of every system query option that was present on the request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQueryOptions {
    pub count: Option<String>,
    pub delta_token: Option<String>,
    pub format: Option<String>,
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub search: Option<String>,
    pub select: Option<String>,
    pub expand: Option<String>,
    pub skip: Option<String>,
    pub skip_token: Option<String>,
    pub top: Option<String>,
}

impl RawQueryOptions {
    /// Collect system query options from decoded key/value pairs.
    ///
    /// Keys without the `$` prefix are custom options and are ignored. When a
    /// key repeats, the first occurrence wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();

        for (key, value) in pairs {
            if let Some(option) = QueryOption::parse_key(key.as_ref()) {
                let slot = raw.slot_mut(option);
                if slot.is_none() {
                    *slot = Some(value.into());
                }
            }
        }

        raw
    }

    pub fn get(&self, option: QueryOption) -> Option<&str> {
        let value = match option {
            QueryOption::Count => &self.count,
            QueryOption::DeltaToken => &self.delta_token,
            QueryOption::Format => &self.format,
            QueryOption::Filter => &self.filter,
            QueryOption::OrderBy => &self.order_by,
            QueryOption::Search => &self.search,
            QueryOption::Select => &self.select,
            QueryOption::Expand => &self.expand,
            QueryOption::Skip => &self.skip,
            QueryOption::SkipToken => &self.skip_token,
            QueryOption::Top => &self.top,
        };
        value.as_deref()
    }

    pub fn is_present(&self, option: QueryOption) -> bool {
        self.get(option).is_some()
    }

    fn slot_mut(&mut self, option: QueryOption) -> &mut Option<String> {
        match option {
            QueryOption::Count => &mut self.count,
            QueryOption::DeltaToken => &mut self.delta_token,
            QueryOption::Format => &mut self.format,
            QueryOption::Filter => &mut self.filter,
            QueryOption::OrderBy => &mut self.order_by,
            QueryOption::Search => &mut self.search,
            QueryOption::Select => &mut self.select,
            QueryOption::Expand => &mut self.expand,
            QueryOption::Skip => &mut self.skip,
            QueryOption::SkipToken => &mut self.skip_token,
            QueryOption::Top => &mut self.top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for option in QueryOption::CHECK_ORDER {
            assert_eq!(QueryOption::parse_key(option.key()), Some(option));
        }
        assert_eq!(QueryOption::parse_key("$OrderBy"), Some(QueryOption::OrderBy));
        assert_eq!(QueryOption::parse_key("top"), None);
        assert_eq!(QueryOption::parse_key("$apply"), None);
    }

    #[test]
    fn test_flags_are_distinct() {
        let mut seen = AllowedQueryOptions::EMPTY;
        for option in QueryOption::CHECK_ORDER {
            assert!(!seen.contains(option.flag()));
            seen |= option.flag();
        }
        assert_eq!(seen, AllowedQueryOptions::ALL);
    }

    #[test]
    fn test_from_pairs() {
        let raw = RawQueryOptions::from_pairs(vec![
            ("$filter", "Name eq 'a'"),
            ("api-version", "2.0"),
            ("$TOP", "10"),
            ("$top", "20"),
            ("$select", ""),
            ("$skiptoken", "abc"),
        ]);

        assert_eq!(raw.get(QueryOption::Filter), Some("Name eq 'a'"));
        assert_eq!(raw.get(QueryOption::Top), Some("10"));
        assert!(raw.is_present(QueryOption::Select));
        assert!(raw.is_present(QueryOption::SkipToken));
        assert!(!raw.is_present(QueryOption::Format));
    }

    #[test]
    fn test_display_uses_key() {
        assert_eq!(QueryOption::DeltaToken.to_string(), "$deltatoken");
        assert_eq!(QueryOption::DeltaToken.name(), "DeltaToken");
    }
}
