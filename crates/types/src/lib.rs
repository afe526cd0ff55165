//! Strongly typed process schema definitions shared by the engine, the
//! collaborator crates and the CLI.
//!
//! The models here mirror the stored process documents: a [`Process`] is an
//! ordered list of [`Step`]s whose `meta` payload is decoded into a typed
//! [`StepConfig`] variant per step type. Pool values are modelled by
//! [`Variable`] and [`PoolEntry`].

pub mod condition;
pub mod process;
pub mod variable;

pub use condition::{Condition, Operand, Operator, Statement, TypedOperand, UnsupportedOperator};
pub use process::meta::{
    ApiCallMeta, ApiEndpoint, ApiMethod, CreatePdfMeta, EmailMessage, EmailRecipient, EntrySource, FieldAssignment,
    FindRecordMeta, IfMeta, KeyValueEntry, RecipientKind, SendEmailMeta, SourceSelector, TemplateRef, UpdateRecordMeta,
};
pub use process::{OutputPolicy, Process, Step, StepConfig, StepDecodeError, StepKind};
pub use variable::{PoolEntry, Variable, VariableField, VariableHandle, VariableReference, VariableSelector, value_is_truthy};
