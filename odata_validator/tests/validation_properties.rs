//! Public API behavior of the query validator

use assert_matches::assert_matches;
use odata_validator::query::{
    BinaryOperatorKind, NodeKind, OrderByClause, OrderByItem, OrderDirection,
};
use odata_validator::{
    validate_query, AllowedFunctions, AllowedLogicalOperators, AllowedQueryOptions,
    ExpressionNode, ParsedQuery, QueryOption, QueryValidator, RawQueryOptions, ValidationError,
    ValidationSettings,
};
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;

fn property(name: &str) -> ExpressionNode {
    ExpressionNode::property(name)
}

fn constant(value: serde_json::Value) -> ExpressionNode {
    ExpressionNode::constant(value)
}

/// `a eq b and c gt d`
fn eq_and_gt() -> ExpressionNode {
    ExpressionNode::and(
        ExpressionNode::eq(property("A"), property("B")),
        ExpressionNode::binary(BinaryOperatorKind::GreaterThan, property("C"), property("D")),
    )
}

fn every_node_kind_filter() -> ExpressionNode {
    let orders = ExpressionNode::CollectionPropertyAccess {
        source: Box::new(ExpressionNode::EntityRangeVariableReference {
            name: "$it".to_string(),
        }),
        property: "Orders".to_string(),
    };

    let manager = ExpressionNode::SingleEntityCast {
        source: Box::new(ExpressionNode::EntityRangeVariableReference {
            name: "$it".to_string(),
        }),
        type_name: "Model.Manager".to_string(),
    };
    let is_manager = ExpressionNode::SingleEntityFunctionCall {
        name: "isof".to_string(),
        parameters: vec![manager, constant(json!("Model.Manager"))],
    };

    let filter = ExpressionNode::or(
        ExpressionNode::and(
            ExpressionNode::Any {
                source: Box::new(orders.clone()),
                body: Some(Box::new(ExpressionNode::binary(
                    BinaryOperatorKind::GreaterThanOrEqual,
                    ExpressionNode::binary(
                        BinaryOperatorKind::Multiply,
                        ExpressionNode::NonentityRangeVariableReference {
                            name: "o".to_string(),
                        },
                        constant(json!(2)),
                    ),
                    constant(json!(10)),
                ))),
                range_variable: Some("o".to_string()),
            },
            ExpressionNode::All {
                source: Box::new(ExpressionNode::EntityCollectionCast {
                    source: Box::new(orders),
                    type_name: "Model.SpecialOrder".to_string(),
                }),
                body: Box::new(constant(json!(true))),
                range_variable: None,
            },
        ),
        ExpressionNode::unary(
            odata_validator::query::UnaryOperatorKind::Not,
            ExpressionNode::function(
                "startswith",
                vec![
                    ExpressionNode::function(
                        "tolower",
                        vec![ExpressionNode::Convert {
                            source: Box::new(ExpressionNode::SingleValueOpenPropertyAccess {
                                name: "Nickname".to_string(),
                            }),
                        }],
                    ),
                    constant(json!("mo")),
                ],
            ),
        ),
    );

    ExpressionNode::or(
        filter,
        ExpressionNode::and(
            is_manager,
            ExpressionNode::eq(property("Title"), constant(json!("lead"))),
        ),
    )
}

#[test]
fn test_every_node_kind_filter_covers_known_kinds() {
    let filter = every_node_kind_filter();
    let mut kinds = HashSet::new();
    let mut stack = vec![&filter];
    while let Some(node) = stack.pop() {
        kinds.insert(node.kind());
        stack.extend(node.children());
    }

    assert!(kinds.contains(&NodeKind::SingleEntityFunctionCall));
    assert!(kinds.contains(&NodeKind::SingleEntityCast));
    assert!(!kinds.contains(&NodeKind::Unrecognized));
    assert_eq!(kinds.len(), 15);
}

#[test]
fn test_fully_permissive_settings_accept_everything() {
    let settings = ValidationSettings::default();
    let query = ParsedQuery {
        order_by: Some(OrderByClause {
            items: vec![OrderByItem {
                expression: property("Name"),
                direction: OrderDirection::Descending,
            }],
        }),
        ..Default::default()
    }
    .with_filter(every_node_kind_filter())
    .with_skip(i64::MAX)
    .with_top(i64::MAX);

    assert!(validate_query(&query, &settings).is_ok());
}

#[test]
fn test_count_rejected_regardless_of_other_options() {
    let settings = ValidationSettings::builder()
        .allow_query_options(AllowedQueryOptions::ALL.difference(AllowedQueryOptions::COUNT))
        .allow_logical_operators(AllowedLogicalOperators::EMPTY)
        .max_top(1)
        .build();
    let query = ParsedQuery::default()
        .with_count(true)
        .with_filter(eq_and_gt())
        .with_top(500);

    let error = validate_query(&query, &settings).unwrap_err();
    assert_eq!(
        error,
        ValidationError::OptionNotAllowed {
            option: QueryOption::Count
        }
    );
    assert_eq!(error.to_string(), "The 'Count' query option is not allowed.");
}

#[test]
fn test_outer_and_rejected_before_children() {
    let settings = ValidationSettings::builder()
        .allow_logical_operators(
            AllowedLogicalOperators::EQUAL | AllowedLogicalOperators::GREATER_THAN,
        )
        .build();

    assert!(validate_query(
        &ParsedQuery::default().with_filter(ExpressionNode::eq(property("A"), property("B"))),
        &settings
    )
    .is_ok());

    let error = validate_query(&ParsedQuery::default().with_filter(eq_and_gt()), &settings)
        .unwrap_err();
    assert_eq!(error.to_string(), "The 'And' logical operator is not allowed.");
}

#[test]
fn test_contains_requires_substring_of() {
    let settings = ValidationSettings::builder()
        .allow_functions(AllowedFunctions::ALL_FUNCTIONS.difference(AllowedFunctions::SUBSTRING_OF))
        .build();
    let query = ParsedQuery::default().with_filter(ExpressionNode::function(
        "contains",
        vec![property("Name"), constant(json!("x"))],
    ));

    assert_matches!(
        validate_query(&query, &settings),
        Err(ValidationError::FunctionNotAllowed { function }) if function == "contains"
    );
}

#[test]
fn test_skip_ceiling() {
    let capped = ValidationSettings::builder().max_skip(20).build();
    assert_matches!(
        validate_query(&ParsedQuery::default().with_skip(50), &capped),
        Err(ValidationError::SkipExceedsMaximum { value: 50, max: 20 })
    );

    let uncapped = ValidationSettings::default();
    for skip in [0, 50, i64::MAX] {
        assert!(validate_query(&ParsedQuery::default().with_skip(skip), &uncapped).is_ok());
    }
}

#[test]
fn test_top_ceiling_is_inclusive() {
    let settings = ValidationSettings::builder().max_top(100).build();

    assert!(validate_query(&ParsedQuery::default().with_top(100), &settings).is_ok());
    assert_matches!(
        validate_query(&ParsedQuery::default().with_top(101), &settings),
        Err(ValidationError::TopExceedsMaximum { value: 101, max: 100 })
    );
}

#[test]
fn test_validation_is_idempotent() {
    let validator = QueryValidator::new();
    let settings = ValidationSettings::builder()
        .allow_logical_operators(AllowedLogicalOperators::EQUAL)
        .build();
    let failing = ParsedQuery::default().with_filter(eq_and_gt());
    let passing = ParsedQuery::default().with_top(3);

    let first = validator.validate(&failing, &settings);
    let second = validator.validate(&failing, &settings);
    assert!(first.is_err());
    assert_eq!(first, second);

    assert_eq!(
        validator.validate(&passing, &settings),
        validator.validate(&passing, &settings)
    );
}

#[test]
fn test_deep_filter_rejected_instead_of_crashing() {
    let settings = ValidationSettings::default();
    let max = settings.max_expression_depth;

    let mut node = constant(json!(1));
    for _ in 0..20_000 {
        node = ExpressionNode::binary(BinaryOperatorKind::Add, node, constant(json!(1)));
    }
    let query = ParsedQuery::default().with_filter(node);

    assert_matches!(
        validate_query(&query, &settings),
        Err(ValidationError::ExpressionTooComplex { depth, max: limit }) if depth == max + 1 && limit == max
    );

    // Unwind the left spine iteratively so dropping the tree stays shallow
    let mut current = query.filter.map(|f| f.expression);
    while let Some(ExpressionNode::BinaryOperator { left, .. }) = current {
        current = Some(*left);
    }
}

#[test]
fn test_settings_file_drives_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
allowed_query_options = ["filter", "top"]
allowed_logical_operators = ["equal", "and"]
allowed_arithmetic_operators = "none"
allowed_functions = ["to_lower"]
max_top = 25
"#
    )
    .unwrap();
    let settings = ValidationSettings::load(file.path()).unwrap();

    let allowed = ParsedQuery::default()
        .with_filter(ExpressionNode::eq(
            ExpressionNode::function("tolower", vec![property("Name")]),
            constant(json!("mo")),
        ))
        .with_top(25);
    assert!(validate_query(&allowed, &settings).is_ok());

    let with_format = allowed
        .clone()
        .with_raw(RawQueryOptions::from_pairs([("$format", "json")]));
    assert_matches!(
        validate_query(&with_format, &settings),
        Err(ValidationError::OptionNotAllowed {
            option: QueryOption::Format
        })
    );
}

#[test]
fn test_json_query_document() {
    let settings = ValidationSettings::builder()
        .allow_functions(AllowedFunctions::ANY)
        .build();
    let query = ParsedQuery::from_json_str(
        r#"{
            "filter": {
                "expression": {
                    "kind": "any",
                    "source": {
                        "kind": "collection_property_access",
                        "source": {"kind": "entity_range_variable_reference", "name": "$it"},
                        "property": "Tags"
                    },
                    "body": {
                        "kind": "single_value_function_call",
                        "name": "endswith",
                        "parameters": [
                            {"kind": "nonentity_range_variable_reference", "name": "t"},
                            {"kind": "constant", "value": "-beta"}
                        ]
                    },
                    "range_variable": "t"
                }
            }
        }"#,
    )
    .unwrap();

    let error = validate_query(&query, &settings).unwrap_err();
    assert_eq!(error.to_string(), "The 'endswith' function is not allowed.");
    assert!(error.is_policy_violation());
}

/// `tolower(tolower(...(Name)))` with `calls` nested function calls
fn nested_call_document(calls: usize) -> String {
    let mut expression = r#"{"kind":"single_value_open_property_access","name":"Name"}"#.to_string();
    for _ in 0..calls {
        expression = format!(
            r#"{{"kind":"single_value_function_call","name":"tolower","parameters":[{}]}}"#,
            expression
        );
    }
    format!(r#"{{"filter":{{"expression":{}}},"top":1}}"#, expression)
}

#[test]
fn test_json_filter_depth_enforced_by_walker() {
    let settings = ValidationSettings::builder()
        .allow_functions(AllowedFunctions::TO_LOWER)
        .max_expression_depth(128)
        .build();
    let max = settings.effective_max_depth();

    let at_limit = ParsedQuery::from_json_str_within(&nested_call_document(max - 1), max).unwrap();
    assert!(validate_query(&at_limit, &settings).is_ok());

    let past_limit = ParsedQuery::from_json_str_within(&nested_call_document(max), max).unwrap();
    assert_matches!(
        validate_query(&past_limit, &settings),
        Err(ValidationError::ExpressionTooComplex { depth: 129, max: 128 })
    );
}
