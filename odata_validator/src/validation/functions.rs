//! Canonical function name to allow-list flag lookup

use crate::settings::AllowedFunctions;
use std::collections::HashMap;
use std::sync::OnceLock;

static FUNCTION_TABLE: OnceLock<HashMap<&'static str, AllowedFunctions>> = OnceLock::new();

fn function_table() -> &'static HashMap<&'static str, AllowedFunctions> {
    FUNCTION_TABLE.get_or_init(|| {
        HashMap::from([
            ("any", AllowedFunctions::ANY),
            ("all", AllowedFunctions::ALL),
            ("cast", AllowedFunctions::CAST),
            ("ceiling", AllowedFunctions::CEILING),
            ("concat", AllowedFunctions::CONCAT),
            ("contains", AllowedFunctions::SUBSTRING_OF),
            ("day", AllowedFunctions::DAY),
            ("endswith", AllowedFunctions::ENDS_WITH),
            ("floor", AllowedFunctions::FLOOR),
            ("hour", AllowedFunctions::HOUR),
            ("indexof", AllowedFunctions::INDEX_OF),
            ("isof", AllowedFunctions::IS_OF),
            ("length", AllowedFunctions::LENGTH),
            ("minute", AllowedFunctions::MINUTE),
            ("month", AllowedFunctions::MONTH),
            ("round", AllowedFunctions::ROUND),
            ("second", AllowedFunctions::SECOND),
            ("startswith", AllowedFunctions::STARTS_WITH),
            ("substring", AllowedFunctions::SUBSTRING),
            ("tolower", AllowedFunctions::TO_LOWER),
            ("toupper", AllowedFunctions::TO_UPPER),
            ("trim", AllowedFunctions::TRIM),
            ("year", AllowedFunctions::YEAR),
            ("date", AllowedFunctions::DATE),
            ("time", AllowedFunctions::TIME),
            ("fractionalseconds", AllowedFunctions::FRACTIONAL_SECONDS),
        ])
    })
}

/// Flag for a function name as it appears in the query (case-sensitive).
/// Unknown names map to the empty set, which no settings value contains.
pub fn function_flag(name: &str) -> AllowedFunctions {
    function_table()
        .get(name)
        .copied()
        .unwrap_or(AllowedFunctions::EMPTY)
}

pub fn is_known_function(name: &str) -> bool {
    function_table().contains_key(name)
}
