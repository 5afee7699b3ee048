//! Allow-list bit sets for query options, operators and functions
//!
//! Every set is a `u32` newtype with one named constant per flag. Sets
//! serialize as a list of snake_case names; the bare strings `"all"` and
//! `"none"` are accepted as shorthands. For [`AllowedFunctions`] the string
//! `"all"` means every function, while the list `["all"]` means only the
//! `all` lambda operator.

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

macro_rules! option_set {
    (
        $(#[$outer:meta])*
        pub struct $name:ident: $label:literal {
            $(
                $(#[$inner:meta])*
                const $flag:ident = $bit:expr => $token:literal;
            )+
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            pub const EMPTY: Self = Self(0);

            $(
                $(#[$inner])*
                pub const $flag: Self = Self($bit);
            )+

            const NAMED: &'static [(&'static str, Self)] = &[$(($token, Self::$flag)),+];

            /// Union of every named flag
            pub const fn all() -> Self {
                Self(0 $(| $bit)+)
            }

            pub const fn bits(&self) -> u32 {
                self.0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True when every bit of `other` is set. The empty set is never contained.
            pub const fn contains(&self, other: Self) -> bool {
                other.0 != 0 && self.0 & other.0 == other.0
            }

            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Look up a single flag by its snake_case name (case-insensitive)
            pub fn from_name(name: &str) -> Option<Self> {
                Self::NAMED
                    .iter()
                    .find(|(token, _)| token.eq_ignore_ascii_case(name))
                    .map(|(_, flag)| *flag)
            }

            /// Names of the single flags present, in declaration order
            pub fn names(&self) -> Vec<&'static str> {
                Self::NAMED
                    .iter()
                    .filter(|(_, flag)| self.contains(*flag))
                    .map(|(token, _)| *token)
                    .collect()
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.insert(rhs);
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.names().join(" | "))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_empty() {
                    write!(f, "none")
                } else {
                    write!(f, "{}", self.names().join(", "))
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if *self == Self::all() {
                    serializer.serialize_str("all")
                } else {
                    serializer.collect_seq(self.names())
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct SetVisitor;

                impl<'de> Visitor<'de> for SetVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "\"all\", \"none\" or a list of {} names", $label)
                    }

                    fn visit_str<E: de::Error>(self, value: &str) -> Result<$name, E> {
                        if value.eq_ignore_ascii_case("all") {
                            Ok($name::all())
                        } else if value.eq_ignore_ascii_case("none") {
                            Ok($name::EMPTY)
                        } else {
                            Err(E::invalid_value(de::Unexpected::Str(value), &self))
                        }
                    }

                    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<$name, A::Error> {
                        let mut set = $name::EMPTY;
                        while let Some(name) = seq.next_element::<String>()? {
                            let flag = $name::from_name(&name).ok_or_else(|| {
                                de::Error::custom(format!("unknown {} name '{}'", $label, name))
                            })?;
                            set.insert(flag);
                        }
                        Ok(set)
                    }
                }

                deserializer.deserialize_any(SetVisitor)
            }
        }
    };
}

option_set! {
    /// System query options a request may carry
    pub struct AllowedQueryOptions: "query option" {
        const COUNT = 0x1 => "count";
        const DELTA_TOKEN = 0x2 => "delta_token";
        const FORMAT = 0x4 => "format";
        const FILTER = 0x8 => "filter";
        const ORDER_BY = 0x10 => "order_by";
        const SEARCH = 0x20 => "search";
        const SELECT = 0x40 => "select";
        const EXPAND = 0x80 => "expand";
        const SKIP = 0x100 => "skip";
        const SKIP_TOKEN = 0x200 => "skip_token";
        const TOP = 0x400 => "top";
    }
}

impl AllowedQueryOptions {
    pub const ALL: Self = Self::all();
}

option_set! {
    /// Logical and comparison operators allowed in $filter
    pub struct AllowedLogicalOperators: "logical operator" {
        const OR = 0x1 => "or";
        const AND = 0x2 => "and";
        const EQUAL = 0x4 => "equal";
        const NOT_EQUAL = 0x8 => "not_equal";
        const GREATER_THAN = 0x10 => "greater_than";
        const GREATER_THAN_OR_EQUAL = 0x20 => "greater_than_or_equal";
        const LESS_THAN = 0x40 => "less_than";
        const LESS_THAN_OR_EQUAL = 0x80 => "less_than_or_equal";
        /// Also gates unary negation
        const NOT = 0x100 => "not";
        const HAS = 0x200 => "has";
    }
}

impl AllowedLogicalOperators {
    pub const ALL: Self = Self::all();
}

option_set! {
    /// Arithmetic operators allowed in $filter
    pub struct AllowedArithmeticOperators: "arithmetic operator" {
        const ADD = 0x1 => "add";
        const SUBTRACT = 0x2 => "subtract";
        const MULTIPLY = 0x4 => "multiply";
        const DIVIDE = 0x8 => "divide";
        const MODULO = 0x10 => "modulo";
    }
}

impl AllowedArithmeticOperators {
    pub const ALL: Self = Self::all();
}

option_set! {
    /// Canonical functions and lambda operators allowed in $filter
    pub struct AllowedFunctions: "function" {
        /// `any` lambda operator
        const ANY = 1 << 0 => "any";
        /// `all` lambda operator
        const ALL = 1 << 1 => "all";
        const CAST = 1 << 2 => "cast";
        const CEILING = 1 << 3 => "ceiling";
        const CONCAT = 1 << 4 => "concat";
        /// `contains`
        const SUBSTRING_OF = 1 << 5 => "substring_of";
        const DAY = 1 << 6 => "day";
        const ENDS_WITH = 1 << 7 => "ends_with";
        const FLOOR = 1 << 8 => "floor";
        const HOUR = 1 << 9 => "hour";
        const INDEX_OF = 1 << 10 => "index_of";
        const IS_OF = 1 << 11 => "is_of";
        const LENGTH = 1 << 12 => "length";
        const MINUTE = 1 << 13 => "minute";
        const MONTH = 1 << 14 => "month";
        const ROUND = 1 << 15 => "round";
        const SECOND = 1 << 16 => "second";
        const STARTS_WITH = 1 << 17 => "starts_with";
        const SUBSTRING = 1 << 18 => "substring";
        const TO_LOWER = 1 << 19 => "to_lower";
        const TO_UPPER = 1 << 20 => "to_upper";
        const TRIM = 1 << 21 => "trim";
        const YEAR = 1 << 22 => "year";
        const DATE = 1 << 23 => "date";
        const TIME = 1 << 24 => "time";
        const FRACTIONAL_SECONDS = 1 << 25 => "fractional_seconds";
    }
}

impl AllowedFunctions {
    pub const ALL_STRING_FUNCTIONS: Self = Self(
        Self::CONCAT.0
            | Self::SUBSTRING_OF.0
            | Self::ENDS_WITH.0
            | Self::INDEX_OF.0
            | Self::LENGTH.0
            | Self::STARTS_WITH.0
            | Self::SUBSTRING.0
            | Self::TO_LOWER.0
            | Self::TO_UPPER.0
            | Self::TRIM.0,
    );

    pub const ALL_DATE_TIME_FUNCTIONS: Self = Self(
        Self::DAY.0
            | Self::HOUR.0
            | Self::MINUTE.0
            | Self::MONTH.0
            | Self::SECOND.0
            | Self::YEAR.0
            | Self::DATE.0
            | Self::TIME.0
            | Self::FRACTIONAL_SECONDS.0,
    );

    pub const ALL_MATH_FUNCTIONS: Self = Self(Self::CEILING.0 | Self::FLOOR.0 | Self::ROUND.0);

    pub const ALL_FUNCTIONS: Self = Self::all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_requires_every_bit() {
        let set = AllowedLogicalOperators::AND | AllowedLogicalOperators::OR;

        assert!(set.contains(AllowedLogicalOperators::AND));
        assert!(set.contains(AllowedLogicalOperators::AND | AllowedLogicalOperators::OR));
        assert!(!set.contains(AllowedLogicalOperators::AND | AllowedLogicalOperators::NOT));
    }

    #[test]
    fn test_empty_set_never_contained() {
        assert!(!AllowedFunctions::ALL_FUNCTIONS.contains(AllowedFunctions::EMPTY));
        assert!(!AllowedQueryOptions::ALL.contains(AllowedQueryOptions::EMPTY));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut set = AllowedArithmeticOperators::ALL;
        set.remove(AllowedArithmeticOperators::MODULO);

        assert!(!set.contains(AllowedArithmeticOperators::MODULO));
        assert!(set.contains(AllowedArithmeticOperators::DIVIDE));

        set |= AllowedArithmeticOperators::MODULO;
        assert_eq!(set, AllowedArithmeticOperators::ALL);
    }

    #[test]
    fn test_function_groups_partition() {
        let groups = AllowedFunctions::ALL_STRING_FUNCTIONS
            | AllowedFunctions::ALL_DATE_TIME_FUNCTIONS
            | AllowedFunctions::ALL_MATH_FUNCTIONS;
        let rest = AllowedFunctions::ALL_FUNCTIONS.difference(groups);

        assert_eq!(
            rest.names(),
            vec!["any", "all", "cast", "is_of"]
        );
        assert_eq!(AllowedFunctions::ALL_FUNCTIONS.names().len(), 26);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            AllowedQueryOptions::from_name("order_by"),
            Some(AllowedQueryOptions::ORDER_BY)
        );
        assert_eq!(
            AllowedLogicalOperators::from_name("Not_Equal"),
            Some(AllowedLogicalOperators::NOT_EQUAL)
        );
        assert_eq!(AllowedFunctions::from_name("contains"), None);
    }

    #[test]
    fn test_display_and_debug() {
        let set = AllowedQueryOptions::FILTER | AllowedQueryOptions::TOP;

        assert_eq!(set.to_string(), "filter, top");
        assert_eq!(AllowedQueryOptions::EMPTY.to_string(), "none");
        assert_eq!(format!("{:?}", set), "AllowedQueryOptions(filter | top)");
    }

    #[test]
    fn test_serde_names_and_shorthands() {
        let set: AllowedQueryOptions = serde_json::from_str(r#"["filter", "skip"]"#).unwrap();
        assert_eq!(set, AllowedQueryOptions::FILTER | AllowedQueryOptions::SKIP);

        let all: AllowedFunctions = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(all, AllowedFunctions::ALL_FUNCTIONS);

        let lambda_only: AllowedFunctions = serde_json::from_str(r#"["all"]"#).unwrap();
        assert_eq!(lambda_only, AllowedFunctions::ALL);

        let none: AllowedArithmeticOperators = serde_json::from_str(r#""none""#).unwrap();
        assert!(none.is_empty());

        assert_eq!(
            serde_json::to_string(&AllowedLogicalOperators::ALL).unwrap(),
            r#""all""#
        );
        assert_eq!(
            serde_json::to_string(&(AllowedLogicalOperators::EQUAL | AllowedLogicalOperators::AND))
                .unwrap(),
            r#"["and","equal"]"#
        );
    }

    #[test]
    fn test_serde_rejects_unknown_names() {
        let err = serde_json::from_str::<AllowedFunctions>(r#"["trim", "soundex"]"#).unwrap_err();
        assert!(err.to_string().contains("unknown function name 'soundex'"));

        assert!(serde_json::from_str::<AllowedQueryOptions>(r#""some""#).is_err());
    }
}
