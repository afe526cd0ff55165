//! Condition documents evaluated by the engine's condition evaluator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::variable::VariableField;

/// Ordered list of statements, all of which must hold.
///
/// `object` optionally scopes record lookups to one collection; steps that
/// search records fall back to their own `object` when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Condition {
    /// True when any operand reads a field of a candidate record.
    pub fn references_record_fields(&self) -> bool {
        self.statements
            .iter()
            .any(|statement| statement.lhs.is_record_field() || statement.rhs.is_record_field())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub lhs: Operand,
    pub operator: String,
    pub rhs: Operand,
}

/// Either a typed operand (`{type, value}`) or a bare JSON literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Typed(TypedOperand),
    Literal(Value),
}

impl Operand {
    pub fn is_record_field(&self) -> bool {
        matches!(self, Operand::Typed(TypedOperand::Field(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedOperand {
    /// A constant value.
    Literal(Value),
    /// `pool[variable].data[field]`.
    Variable(VariableField),
    /// A field of the record currently being matched.
    Field(String),
}

/// Comparison operators understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
}

#[derive(Debug, Error)]
#[error("unsupported condition operator '{0}'")]
pub struct UnsupportedOperator(pub String);

impl FromStr for Operator {
    type Err = UnsupportedOperator;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "==" | "===" | "=" | "equals" | "eq" => Ok(Operator::Equal),
            "!=" | "!==" | "not_equals" | "ne" => Ok(Operator::NotEqual),
            ">" | "gt" => Ok(Operator::Greater),
            ">=" | "gte" => Ok(Operator::GreaterOrEqual),
            "<" | "lt" => Ok(Operator::Less),
            "<=" | "lte" => Ok(Operator::LessOrEqual),
            "contains" | "includes" => Ok(Operator::Contains),
            other => Err(UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Contains => "contains",
        };
        f.write_str(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operands_decode_typed_and_bare_forms() {
        let condition: Condition = serde_json::from_value(json!({
            "object": "customers",
            "statements": [
                {"lhs": {"type": "field", "value": "email"}, "operator": "==", "rhs": {"type": "variable", "value": {"variable": {"name": "input"}, "field": "email"}}},
                {"lhs": 3, "operator": "<", "rhs": {"type": "literal", "value": 4}}
            ]
        }))
        .unwrap();

        assert_eq!(condition.statements.len(), 2);
        assert!(condition.references_record_fields());
        assert_eq!(condition.statements[1].lhs, Operand::Literal(json!(3)));
        assert_eq!(condition.statements[1].rhs, Operand::Typed(TypedOperand::Literal(json!(4))));
    }

    #[test]
    fn operator_parsing_accepts_symbols_and_words() {
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
        assert_eq!("not_equals".parse::<Operator>().unwrap(), Operator::NotEqual);
        assert_eq!(" >= ".parse::<Operator>().unwrap(), Operator::GreaterOrEqual);
        let error = "~=".parse::<Operator>().unwrap_err();
        assert!(error.to_string().contains("~="));
    }
}
