//! $filter expression tree walker
//!
//! Visits every node of a filter expression and rejects the first operator,
//! function or lambda the settings do not allow. Nodes that only wrap another
//! expression (conversions, property access, casts) are transparent; leaves
//! (constants, range variables, open properties) always pass.

use super::error::{ValidationError, ValidationResult};
use super::functions::function_flag;
use crate::config::runtime::ValidationPreferences;
use crate::logging::codes;
use crate::query::{BinaryOperatorKind, ExpressionNode, FilterClause, UnaryOperatorKind};
use crate::settings::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, ValidationSettings,
};
use crate::{log_debug, log_success};

/// Walker recursion bound applied on top of `max_expression_depth`
pub const DEPTH_CEILING: usize = 1024;

/// Validate a parsed $filter clause against the settings
pub fn validate_filter(filter: &FilterClause, settings: &ValidationSettings) -> ValidationResult<()> {
    FilterValidator::new(settings).validate(filter)
}

/// Validate a bare expression tree against the settings
pub fn validate_node(node: &ExpressionNode, settings: &ValidationSettings) -> ValidationResult<()> {
    FilterValidator::new(settings).validate_node(node)
}

/// Walks one expression tree with a fixed set of settings
pub struct FilterValidator<'a> {
    settings: &'a ValidationSettings,
    preferences: &'a ValidationPreferences,
}

impl<'a> FilterValidator<'a> {
    pub fn new(settings: &'a ValidationSettings) -> Self {
        Self {
            settings,
            preferences: super::preferences(),
        }
    }

    pub fn with_preferences(mut self, preferences: &'a ValidationPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn validate(&self, filter: &FilterClause) -> ValidationResult<()> {
        self.validate_node(&filter.expression)?;

        if self.preferences.log_passes {
            log_success!(
                codes::success::FILTER_VALIDATION_PASSED,
                "Filter expression passed validation",
                "range_variable" => filter.range_variable.as_deref().unwrap_or("$it")
            );
        }

        Ok(())
    }

    pub fn validate_node(&self, node: &ExpressionNode) -> ValidationResult<()> {
        self.visit(node, 1)
    }

    fn visit(&self, node: &ExpressionNode, depth: usize) -> ValidationResult<()> {
        let max = self.settings.effective_max_depth();
        if depth > max {
            return Err(self.fail(ValidationError::expression_too_complex(depth, max)));
        }

        if self.preferences.trace_filter_nodes {
            log_debug!("Visiting filter node", "kind" => node.kind(), "depth" => depth);
        }

        let next = depth + 1;

        match node {
            ExpressionNode::BinaryOperator {
                operator,
                left,
                right,
            } => {
                self.check_binary_operator(*operator)?;
                self.visit(left, next)?;
                self.visit(right, next)
            }

            ExpressionNode::UnaryOperator { operator, operand } => {
                self.visit(operand, next)?;
                self.check_unary_operator(operator)
            }

            ExpressionNode::Convert { source }
            | ExpressionNode::SingleValuePropertyAccess { source, .. }
            | ExpressionNode::CollectionPropertyAccess { source, .. }
            | ExpressionNode::SingleEntityCast { source, .. }
            | ExpressionNode::EntityCollectionCast { source, .. } => self.visit(source, next),

            ExpressionNode::SingleValueFunctionCall { name, parameters }
            | ExpressionNode::SingleEntityFunctionCall { name, parameters } => {
                self.check_function(name)?;
                parameters
                    .iter()
                    .try_for_each(|parameter| self.visit(parameter, next))
            }

            ExpressionNode::Any { source, body, .. } => {
                self.check_lambda(AllowedFunctions::ANY, "any")?;
                self.visit(source, next)?;
                match body {
                    // `any()` without a predicate is parsed with a constant `true` body
                    Some(body) if !body.is_constant() => self.visit(body, next),
                    _ => Ok(()),
                }
            }

            ExpressionNode::All { source, body, .. } => {
                self.check_lambda(AllowedFunctions::ALL, "all")?;
                self.visit(source, next)?;
                self.visit(body, next)
            }

            ExpressionNode::Constant { .. }
            | ExpressionNode::EntityRangeVariableReference { .. }
            | ExpressionNode::NonentityRangeVariableReference { .. }
            | ExpressionNode::SingleValueOpenPropertyAccess { .. } => Ok(()),

            ExpressionNode::Unrecognized => Err(self.fail(ValidationError::unsupported_node(
                node.kind().as_str(),
            ))),
        }
    }

    fn check_binary_operator(&self, operator: BinaryOperatorKind) -> ValidationResult<()> {
        if operator.is_arithmetic() {
            if !self
                .settings
                .allowed_arithmetic_operators
                .contains(arithmetic_flag(operator))
            {
                return Err(self.fail(ValidationError::arithmetic_operator_not_allowed(
                    operator.as_str(),
                )));
            }
        } else if !self
            .settings
            .allowed_logical_operators
            .contains(logical_flag(operator))
        {
            return Err(self.fail(ValidationError::logical_operator_not_allowed(
                operator.as_str(),
            )));
        }

        Ok(())
    }

    fn check_unary_operator(&self, operator: &UnaryOperatorKind) -> ValidationResult<()> {
        match operator {
            // Negation shares the logical NOT flag
            UnaryOperatorKind::Negate | UnaryOperatorKind::Not => {
                if self
                    .settings
                    .allowed_logical_operators
                    .contains(AllowedLogicalOperators::NOT)
                {
                    Ok(())
                } else {
                    Err(self.fail(ValidationError::logical_operator_not_allowed(
                        operator.as_str(),
                    )))
                }
            }
            UnaryOperatorKind::Other(name) => Err(self.fail(ValidationError::unsupported_node(
                &format!("UnaryOperator({})", name),
            ))),
        }
    }

    fn check_function(&self, name: &str) -> ValidationResult<()> {
        if self.settings.allowed_functions.contains(function_flag(name)) {
            Ok(())
        } else {
            Err(self.fail(ValidationError::function_not_allowed(name)))
        }
    }

    fn check_lambda(&self, flag: AllowedFunctions, name: &str) -> ValidationResult<()> {
        if self.settings.allowed_functions.contains(flag) {
            Ok(())
        } else {
            Err(self.fail(ValidationError::function_not_allowed(name)))
        }
    }

    fn fail(&self, error: ValidationError) -> ValidationError {
        error.report(self.preferences)
    }
}

/// Logical allow-list flag for a non-arithmetic binary operator
fn logical_flag(operator: BinaryOperatorKind) -> AllowedLogicalOperators {
    match operator {
        BinaryOperatorKind::Or => AllowedLogicalOperators::OR,
        BinaryOperatorKind::And => AllowedLogicalOperators::AND,
        BinaryOperatorKind::Equal => AllowedLogicalOperators::EQUAL,
        BinaryOperatorKind::NotEqual => AllowedLogicalOperators::NOT_EQUAL,
        BinaryOperatorKind::GreaterThan => AllowedLogicalOperators::GREATER_THAN,
        BinaryOperatorKind::GreaterThanOrEqual => AllowedLogicalOperators::GREATER_THAN_OR_EQUAL,
        BinaryOperatorKind::LessThan => AllowedLogicalOperators::LESS_THAN,
        BinaryOperatorKind::LessThanOrEqual => AllowedLogicalOperators::LESS_THAN_OR_EQUAL,
        BinaryOperatorKind::Has => AllowedLogicalOperators::HAS,
        _ => AllowedLogicalOperators::EMPTY,
    }
}

/// Arithmetic allow-list flag for an arithmetic binary operator
fn arithmetic_flag(operator: BinaryOperatorKind) -> AllowedArithmeticOperators {
    match operator {
        BinaryOperatorKind::Add => AllowedArithmeticOperators::ADD,
        BinaryOperatorKind::Subtract => AllowedArithmeticOperators::SUBTRACT,
        BinaryOperatorKind::Multiply => AllowedArithmeticOperators::MULTIPLY,
        BinaryOperatorKind::Divide => AllowedArithmeticOperators::DIVIDE,
        BinaryOperatorKind::Modulo => AllowedArithmeticOperators::MODULO,
        _ => AllowedArithmeticOperators::EMPTY,
    }
}
