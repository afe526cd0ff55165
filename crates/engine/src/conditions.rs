//! Condition evaluation over the pool and the record store.
//!
//! A [`Condition`] is a list of statements that must all hold. Operands are
//! resolved against the pool (`variable` operands), the record being matched
//! (`field` operands) or taken as literals. When any statement reads a record
//! field, the evaluator searches the record store for the first record that
//! satisfies every statement; otherwise it answers with a plain boolean.

use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use workline_types::{Condition, Operand, Operator, PoolEntry, TypedOperand, UnsupportedOperator, Variable};

use crate::pool::Pool;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error(transparent)]
    Operator(#[from] UnsupportedOperator),

    #[error("record lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// What a condition evaluated to.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The first record satisfying every statement.
    Record(Variable),
    Truth(bool),
}

impl Evaluation {
    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluation::Record(_) => true,
            Evaluation::Truth(holds) => *holds,
        }
    }

    /// The pool entry a record lookup stores: the record, `true`, or the
    /// failure sentinel.
    pub fn into_pool_entry(self) -> PoolEntry {
        match self {
            Evaluation::Record(record) => PoolEntry::Variable(record),
            Evaluation::Truth(true) => PoolEntry::Value(Value::Bool(true)),
            Evaluation::Truth(false) => PoolEntry::Failed,
        }
    }
}

/// Evaluates conditions against a pool.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(&self, condition: &Condition, pool: &Pool) -> Result<Evaluation, ConditionError>;
}

/// Evaluator that searches a [`RecordStore`] for `field` conditions.
#[derive(Clone)]
pub struct StoreConditionEvaluator {
    records: Arc<dyn RecordStore>,
}

impl StoreConditionEvaluator {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ConditionEvaluator for StoreConditionEvaluator {
    async fn evaluate(&self, condition: &Condition, pool: &Pool) -> Result<Evaluation, ConditionError> {
        let statements = condition
            .statements
            .iter()
            .map(|statement| Ok((&statement.lhs, statement.operator.parse::<Operator>()?, &statement.rhs)))
            .collect::<Result<Vec<_>, UnsupportedOperator>>()?;

        let holds_for = |record: Option<&Variable>| {
            statements.iter().all(|(lhs, operator, rhs)| {
                let left = resolve_operand(lhs, pool, record);
                let right = resolve_operand(rhs, pool, record);
                compare(*operator, &left, &right)
            })
        };

        if !condition.references_record_fields() {
            return Ok(Evaluation::Truth(holds_for(None)));
        }

        let candidates = self.records.list(condition.object.as_deref()).await?;
        debug!(object = ?condition.object, candidates = candidates.len(), "matching records against condition");
        Ok(candidates
            .into_iter()
            .find(|record| holds_for(Some(record)))
            .map_or(Evaluation::Truth(false), Evaluation::Record))
    }
}

/// Resolves an operand to a value. Missing variables and fields resolve to
/// `null`.
pub fn resolve_operand(operand: &Operand, pool: &Pool, record: Option<&Variable>) -> Value {
    match operand {
        Operand::Literal(value) | Operand::Typed(TypedOperand::Literal(value)) => value.clone(),
        Operand::Typed(TypedOperand::Variable(reference)) => pool
            .variable(reference.variable.name())
            .and_then(|variable| variable.field(&reference.field))
            .cloned()
            .unwrap_or(Value::Null),
        Operand::Typed(TypedOperand::Field(field)) => record
            .and_then(|record| record.field(field))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

/// Applies `operator` with loose typing: numbers and numeric strings compare
/// numerically, everything else compares by its text form.
pub fn compare(operator: Operator, left: &Value, right: &Value) -> bool {
    match operator {
        Operator::Equal => loose_eq(left, right),
        Operator::NotEqual => !loose_eq(left, right),
        Operator::Greater => loose_cmp(left, right) == Some(Ordering::Greater),
        Operator::GreaterOrEqual => matches!(loose_cmp(left, right), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Less => loose_cmp(left, right) == Some(Ordering::Less),
        Operator::LessOrEqual => matches!(loose_cmp(left, right), Some(Ordering::Less | Ordering::Equal)),
        Operator::Contains => match left {
            Value::String(haystack) => !right.is_null() && haystack.contains(&format_value(right)),
            Value::Array(items) => items.iter().any(|item| loose_eq(item, right)),
            _ => false,
        },
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_number(left), as_number(right)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
        (Value::String(_), Value::String(_)) | (Value::Bool(_), Value::Bool(_)) => left == right,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => left == right,
        _ => format_value(left) == format_value(right),
    }
}

fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_null() || right.is_null() {
        return None;
    }
    match (as_number(left), as_number(right)) {
        (Some(left), Some(right)) => left.partial_cmp(&right),
        _ => Some(format_value(left).cmp(&format_value(right))),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if !text.trim().is_empty() => text.trim().parse().ok(),
        _ => None,
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
