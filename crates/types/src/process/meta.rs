//! Per-step-type `meta` payloads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Step;
use crate::condition::Condition;
use crate::variable::{VariableField, VariableSelector};

/// `find_record`: look a record up through the condition evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindRecordMeta {
    #[serde(default)]
    pub conditions: Condition,
}

/// `if`: run nested steps when the condition holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfMeta {
    #[serde(default)]
    pub conditions: Condition,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// `update_record`: overwrite fields of the record behind a pool variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecordMeta {
    pub variable: VariableSelector,
    /// Applied left to right; later entries win on duplicate field names.
    #[serde(default)]
    pub fields: Vec<FieldAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAssignment {
    /// Target field name.
    pub text: String,
    #[serde(default)]
    pub value: Value,
}

/// `create_pdf`: fill a form template from a pool variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePdfMeta {
    pub object: SourceSelector,
    pub template: TemplateRef,
    /// Form field name to include flag, in authoring order.
    #[serde(default)]
    pub fields: IndexMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Name of the pool variable supplying field values.
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    /// Template file identifier, relative to the files directory.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `send_email`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendEmailMeta {
    pub email: EmailMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: EmailRecipient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Recipient of an email: a pool variable field or a literal address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRecipient {
    #[serde(rename = "type", default)]
    pub kind: RecipientKind,
    #[serde(default)]
    pub value: Value,
}

impl EmailRecipient {
    pub fn literal(address: impl Into<String>) -> Self {
        Self {
            kind: RecipientKind::Literal,
            value: Value::String(address.into()),
        }
    }

    /// Decodes `value` as a variable field reference.
    pub fn variable_field(&self) -> Result<VariableField, serde_json::Error> {
        VariableField::deserialize(&self.value)
    }

    /// Literal address: a bare string, a number, or `{ literal: "..." }`.
    pub fn literal_address(&self) -> Option<String> {
        match &self.value {
            Value::String(address) => Some(address.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Object(map) => match map.get("literal") {
                Some(Value::String(address)) => Some(address.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    Variable,
    /// Anything that is not `variable` is treated as a literal.
    #[default]
    #[serde(other)]
    Literal,
}

/// `api_call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallMeta {
    pub api: ApiEndpoint,
    #[serde(default)]
    pub headers: Vec<KeyValueEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub url: String,
    #[serde(rename = "type", default)]
    pub method: ApiMethod,
    #[serde(default)]
    pub body: Vec<KeyValueEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiMethod {
    Get,
    Post,
    #[default]
    #[serde(other)]
    Unsupported,
}

/// A header or body entry. Only `literal` entries are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueEntry {
    #[serde(rename = "type", default)]
    pub source: EntrySource,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl KeyValueEntry {
    pub fn literal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            source: EntrySource::Literal,
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Literal,
    Variable,
    #[default]
    #[serde(other)]
    Other,
}
