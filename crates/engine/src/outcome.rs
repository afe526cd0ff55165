//! Step outcomes and run results.
//!
//! Handlers never return errors: every failure is folded into
//! [`StepOutcome::Failed`] so the interpreter loop cannot be aborted by a
//! step. The value a run returns is a [`RunResult`], which keeps the
//! different result shapes (boolean, payload, the pool itself) apart.

use serde::{Serialize, Serializer};
use serde_json::Value;
use workline_types::PoolEntry;

use crate::pool::Pool;

/// What a step handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step succeeded with a value.
    Succeeded(PoolEntry),
    /// The step's result is the run's pool itself.
    Pool,
    /// The step failed; stored and returned as `false`.
    Failed,
}

impl StepOutcome {
    pub fn value(value: impl Into<Value>) -> Self {
        StepOutcome::Succeeded(PoolEntry::Value(value.into()))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed | StepOutcome::Succeeded(PoolEntry::Failed))
    }

    /// Converts the outcome to the entry written into the pool.
    pub fn into_pool_entry(self, pool: &Pool) -> PoolEntry {
        match self {
            StepOutcome::Succeeded(entry) => entry,
            StepOutcome::Failed => PoolEntry::Failed,
            StepOutcome::Pool => PoolEntry::Value(serde_json::to_value(pool).unwrap_or_default()),
        }
    }
}

/// Final value of a process run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// No result-producing step ran; serializes as `true`.
    Completed,
    /// The last result-producing step failed; serializes as `false`.
    Failed,
    /// The payload produced by the last `api_call`, `create_pdf` or `if` step.
    Payload(Value),
    /// The last `if` step produced the pool itself. Holds the pool as it stood
    /// when the run finished.
    Pool(Pool),
}

impl RunResult {
    /// Mirrors a `length > 0` test on the result: only non-empty strings and
    /// arrays count as content.
    pub fn has_content(&self) -> bool {
        match self {
            RunResult::Payload(Value::String(text)) => !text.is_empty(),
            RunResult::Payload(Value::Array(items)) => !items.is_empty(),
            _ => false,
        }
    }

    pub fn as_payload(&self) -> Option<&Value> {
        match self {
            RunResult::Payload(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_pool(&self) -> Option<&Pool> {
        match self {
            RunResult::Pool(pool) => Some(pool),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RunResult::Completed => Value::Bool(true),
            RunResult::Failed => Value::Bool(false),
            RunResult::Payload(value) => value.clone(),
            RunResult::Pool(pool) => serde_json::to_value(pool).unwrap_or_default(),
        }
    }
}

impl Serialize for RunResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RunResult::Completed => serializer.serialize_bool(true),
            RunResult::Failed => serializer.serialize_bool(false),
            RunResult::Payload(value) => value.serialize(serializer),
            RunResult::Pool(pool) => pool.serialize(serializer),
        }
    }
}

/// The interpreter's "last result" slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LastResult {
    Entry(PoolEntry),
    Pool,
}

impl LastResult {
    pub(crate) fn from_outcome(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Succeeded(entry) => LastResult::Entry(entry),
            StepOutcome::Failed => LastResult::Entry(PoolEntry::Failed),
            StepOutcome::Pool => LastResult::Pool,
        }
    }

    /// Materializes the slot once the run is over.
    pub(crate) fn into_run_result(self, pool: &Pool) -> RunResult {
        match self {
            LastResult::Entry(PoolEntry::Failed) => RunResult::Failed,
            LastResult::Entry(entry) => RunResult::Payload(entry.to_value()),
            LastResult::Pool => RunResult::Pool(pool.clone()),
        }
    }
}
