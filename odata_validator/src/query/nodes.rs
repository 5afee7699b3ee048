//! Semantic expression tree for $filter and $orderby
//!
//! Nodes are produced by an upstream OData parser. In JSON they are
//! internally tagged by `kind`, e.g.
//! `{"kind": "binary_operator", "operator": "equal", "left": ..., "right": ...}`.
//! Kinds this version does not know deserialize to
//! [`ExpressionNode::Unrecognized`] so the validator can reject them instead
//! of failing to load the query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a semantic expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpressionNode {
    BinaryOperator {
        operator: BinaryOperatorKind,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    UnaryOperator {
        operator: UnaryOperatorKind,
        operand: Box<ExpressionNode>,
    },
    Convert {
        source: Box<ExpressionNode>,
    },
    SingleValuePropertyAccess {
        source: Box<ExpressionNode>,
        property: String,
    },
    CollectionPropertyAccess {
        source: Box<ExpressionNode>,
        property: String,
    },
    SingleValueFunctionCall {
        name: String,
        #[serde(default)]
        parameters: Vec<ExpressionNode>,
    },
    SingleEntityFunctionCall {
        name: String,
        #[serde(default)]
        parameters: Vec<ExpressionNode>,
    },
    SingleEntityCast {
        source: Box<ExpressionNode>,
        type_name: String,
    },
    EntityCollectionCast {
        source: Box<ExpressionNode>,
        type_name: String,
    },
    Any {
        source: Box<ExpressionNode>,
        #[serde(default)]
        body: Option<Box<ExpressionNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range_variable: Option<String>,
    },
    All {
        source: Box<ExpressionNode>,
        body: Box<ExpressionNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range_variable: Option<String>,
    },
    Constant {
        value: serde_json::Value,
    },
    EntityRangeVariableReference {
        name: String,
    },
    NonentityRangeVariableReference {
        name: String,
    },
    SingleValueOpenPropertyAccess {
        name: String,
    },
    #[serde(other)]
    Unrecognized,
}

/// Node kind names used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    BinaryOperator,
    UnaryOperator,
    Convert,
    SingleValuePropertyAccess,
    CollectionPropertyAccess,
    SingleValueFunctionCall,
    SingleEntityFunctionCall,
    SingleEntityCast,
    EntityCollectionCast,
    Any,
    All,
    Constant,
    EntityRangeVariableReference,
    NonentityRangeVariableReference,
    SingleValueOpenPropertyAccess,
    Unrecognized,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryOperator => "BinaryOperator",
            Self::UnaryOperator => "UnaryOperator",
            Self::Convert => "Convert",
            Self::SingleValuePropertyAccess => "SingleValuePropertyAccess",
            Self::CollectionPropertyAccess => "CollectionPropertyAccess",
            Self::SingleValueFunctionCall => "SingleValueFunctionCall",
            Self::SingleEntityFunctionCall => "SingleEntityFunctionCall",
            Self::SingleEntityCast => "SingleEntityCast",
            Self::EntityCollectionCast => "EntityCollectionCast",
            Self::Any => "Any",
            Self::All => "All",
            Self::Constant => "Constant",
            Self::EntityRangeVariableReference => "EntityRangeVariableReference",
            Self::NonentityRangeVariableReference => "NonentityRangeVariableReference",
            Self::SingleValueOpenPropertyAccess => "SingleValueOpenPropertyAccess",
            Self::Unrecognized => "Unrecognized",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// === OPERATORS ===

/// Binary operators (EDM BinaryOperatorKind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperatorKind {
    Or,
    And,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Has,
}

impl BinaryOperatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "Or",
            Self::And => "And",
            Self::Equal => "Equal",
            Self::NotEqual => "NotEqual",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Modulo => "Modulo",
            Self::Has => "Has",
        }
    }

    /// Arithmetic operators are gated by the arithmetic allow-list, everything else by the logical one
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }
}

impl fmt::Display for BinaryOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unary operators; unknown operator names are kept so they can be reported
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnaryOperatorKind {
    Negate,
    Not,
    Other(String),
}

impl UnaryOperatorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Negate => "Negate",
            Self::Not => "Not",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for UnaryOperatorKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "negate" => Self::Negate,
            "not" => Self::Not,
            _ => Self::Other(value),
        }
    }
}

impl From<UnaryOperatorKind> for String {
    fn from(value: UnaryOperatorKind) -> Self {
        match value {
            UnaryOperatorKind::Negate => "negate".to_string(),
            UnaryOperatorKind::Not => "not".to_string(),
            UnaryOperatorKind::Other(name) => name,
        }
    }
}

impl fmt::Display for UnaryOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// === NODE HELPERS ===

impl ExpressionNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::BinaryOperator { .. } => NodeKind::BinaryOperator,
            Self::UnaryOperator { .. } => NodeKind::UnaryOperator,
            Self::Convert { .. } => NodeKind::Convert,
            Self::SingleValuePropertyAccess { .. } => NodeKind::SingleValuePropertyAccess,
            Self::CollectionPropertyAccess { .. } => NodeKind::CollectionPropertyAccess,
            Self::SingleValueFunctionCall { .. } => NodeKind::SingleValueFunctionCall,
            Self::SingleEntityFunctionCall { .. } => NodeKind::SingleEntityFunctionCall,
            Self::SingleEntityCast { .. } => NodeKind::SingleEntityCast,
            Self::EntityCollectionCast { .. } => NodeKind::EntityCollectionCast,
            Self::Any { .. } => NodeKind::Any,
            Self::All { .. } => NodeKind::All,
            Self::Constant { .. } => NodeKind::Constant,
            Self::EntityRangeVariableReference { .. } => NodeKind::EntityRangeVariableReference,
            Self::NonentityRangeVariableReference { .. } => {
                NodeKind::NonentityRangeVariableReference
            }
            Self::SingleValueOpenPropertyAccess { .. } => NodeKind::SingleValueOpenPropertyAccess,
            Self::Unrecognized => NodeKind::Unrecognized,
        }
    }

    /// Direct children, in evaluation order
    pub fn children(&self) -> Vec<&ExpressionNode> {
        match self {
            Self::BinaryOperator { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::UnaryOperator { operand, .. } => vec![operand.as_ref()],
            Self::Convert { source }
            | Self::SingleValuePropertyAccess { source, .. }
            | Self::CollectionPropertyAccess { source, .. }
            | Self::SingleEntityCast { source, .. }
            | Self::EntityCollectionCast { source, .. } => vec![source.as_ref()],
            Self::SingleValueFunctionCall { parameters, .. }
            | Self::SingleEntityFunctionCall { parameters, .. } => parameters.iter().collect(),
            Self::Any { source, body, .. } => {
                let mut children = vec![source.as_ref()];
                if let Some(body) = body {
                    children.push(body.as_ref());
                }
                children
            }
            Self::All { source, body, .. } => vec![source.as_ref(), body.as_ref()],
            Self::Constant { .. }
            | Self::EntityRangeVariableReference { .. }
            | Self::NonentityRangeVariableReference { .. }
            | Self::SingleValueOpenPropertyAccess { .. }
            | Self::Unrecognized => Vec::new(),
        }
    }

    /// Tree depth with the root at 1. Iterative, so safe on arbitrarily deep input.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1usize)];

        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for child in node.children() {
                stack.push((child, depth + 1));
            }
        }

        max_depth
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant { .. })
    }

    pub fn binary(
        operator: BinaryOperatorKind,
        left: ExpressionNode,
        right: ExpressionNode,
    ) -> Self {
        Self::BinaryOperator {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::binary(BinaryOperatorKind::And, left, right)
    }

    pub fn or(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::binary(BinaryOperatorKind::Or, left, right)
    }

    pub fn eq(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::binary(BinaryOperatorKind::Equal, left, right)
    }

    pub fn unary(operator: UnaryOperatorKind, operand: ExpressionNode) -> Self {
        Self::UnaryOperator {
            operator,
            operand: Box::new(operand),
        }
    }

    /// Property of the implicit `$it` range variable
    pub fn property(name: &str) -> Self {
        Self::SingleValuePropertyAccess {
            source: Box::new(Self::EntityRangeVariableReference {
                name: "$it".to_string(),
            }),
            property: name.to_string(),
        }
    }

    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Self::Constant {
            value: value.into(),
        }
    }

    pub fn function(name: &str, parameters: Vec<ExpressionNode>) -> Self {
        Self::SingleValueFunctionCall {
            name: name.to_string(),
            parameters,
        }
    }
}
