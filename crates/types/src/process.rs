//! Process definitions and their typed steps.
//!
//! Stored steps carry a free-form `meta` object whose shape depends on the
//! step `type`. Decoding goes through [`RawStep`] so every step ends up as a
//! [`StepConfig`] variant with a typed meta payload; steps of an unrecognised
//! type are kept as [`StepConfig::Unknown`] so callers decide what to do with
//! them.

pub mod meta;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use self::meta::{ApiCallMeta, CreatePdfMeta, FindRecordMeta, IfMeta, SendEmailMeta, UpdateRecordMeta};

/// A named, ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProcess")]
pub struct Process {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

/// Stored processes keep their steps either at the top level or under
/// `meta.steps`; both decode to the same [`Process`].
#[derive(Deserialize)]
struct RawProcess {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    steps: Option<Vec<Step>>,
    #[serde(default)]
    meta: Option<RawProcessMeta>,
}

#[derive(Deserialize)]
struct RawProcessMeta {
    #[serde(default)]
    steps: Vec<Step>,
}

impl From<RawProcess> for Process {
    fn from(raw: RawProcess) -> Self {
        let steps = raw.steps.or_else(|| raw.meta.map(|meta| meta.steps)).unwrap_or_default();
        Self {
            name: raw.name,
            label: raw.label,
            description: raw.description,
            steps,
        }
    }
}

/// One unit of work inside a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct Step {
    /// Human readable label used in logs.
    pub label: String,
    /// Pool key the step's output is written under, for pool-writing steps.
    pub name: String,
    /// Record collection the step works against.
    pub object: String,
    pub config: StepConfig,
}

impl Step {
    pub fn new(name: impl Into<String>, config: StepConfig) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            object: String::new(),
            config,
        }
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = object.into();
        self
    }

    /// The step's type, or `None` for unrecognised types.
    pub fn kind(&self) -> Option<StepKind> {
        self.config.kind()
    }
}

/// Typed step configuration, one variant per step type.
#[derive(Debug, Clone, PartialEq)]
pub enum StepConfig {
    FindRecord(FindRecordMeta),
    If(IfMeta),
    CreatePdf(CreatePdfMeta),
    SendEmail(SendEmailMeta),
    ApiCall(ApiCallMeta),
    UpdateRecord(UpdateRecordMeta),
    /// A step whose `type` is not recognised; the raw meta is retained.
    Unknown { kind: String, meta: Value },
}

impl StepConfig {
    pub fn kind(&self) -> Option<StepKind> {
        match self {
            StepConfig::FindRecord(_) => Some(StepKind::FindRecord),
            StepConfig::If(_) => Some(StepKind::If),
            StepConfig::CreatePdf(_) => Some(StepKind::CreatePdf),
            StepConfig::SendEmail(_) => Some(StepKind::SendEmail),
            StepConfig::ApiCall(_) => Some(StepKind::ApiCall),
            StepConfig::UpdateRecord(_) => Some(StepKind::UpdateRecord),
            StepConfig::Unknown { .. } => None,
        }
    }

    /// The `type` string as stored.
    pub fn type_name(&self) -> &str {
        match self {
            StepConfig::Unknown { kind, .. } => kind,
            known => known.kind().map(StepKind::as_str).unwrap_or_default(),
        }
    }
}

/// The six supported step types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    FindRecord,
    If,
    CreatePdf,
    SendEmail,
    ApiCall,
    UpdateRecord,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::FindRecord,
        StepKind::If,
        StepKind::CreatePdf,
        StepKind::SendEmail,
        StepKind::ApiCall,
        StepKind::UpdateRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::FindRecord => "find_record",
            StepKind::If => "if",
            StepKind::CreatePdf => "create_pdf",
            StepKind::SendEmail => "send_email",
            StepKind::ApiCall => "api_call",
            StepKind::UpdateRecord => "update_record",
        }
    }

    /// How the interpreter folds this step type's output into a run.
    pub fn output_policy(self) -> OutputPolicy {
        match self {
            StepKind::FindRecord | StepKind::SendEmail | StepKind::UpdateRecord => OutputPolicy::WritePool,
            StepKind::ApiCall | StepKind::If | StepKind::CreatePdf => OutputPolicy::SetResult,
        }
    }
}

/// Where a step's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Stored under the step's `name` in the pool.
    WritePool,
    /// Becomes the run's last result; the pool is left untouched.
    SetResult,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| format!("unknown step type '{raw}'"))
    }
}

/// Error raised when a step's `meta` does not match its declared type.
#[derive(Debug, Error)]
#[error("step '{label}' of type '{kind}' has malformed meta: {source}")]
pub struct StepDecodeError {
    label: String,
    kind: StepKind,
    #[source]
    source: serde_json::Error,
}

/// Wire shape of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStep {
    #[serde(default)]
    label: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: String,
    #[serde(default)]
    meta: Value,
}

impl TryFrom<RawStep> for Step {
    type Error = StepDecodeError;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let config = match raw.kind.parse::<StepKind>() {
            Ok(kind) => decode_config(kind, raw.meta).map_err(|source| StepDecodeError {
                label: if raw.label.is_empty() { raw.name.clone() } else { raw.label.clone() },
                kind,
                source,
            })?,
            Err(_) => StepConfig::Unknown {
                kind: raw.kind,
                meta: raw.meta,
            },
        };

        Ok(Step {
            label: raw.label,
            name: raw.name,
            object: raw.object,
            config,
        })
    }
}

fn decode_config(kind: StepKind, meta: Value) -> Result<StepConfig, serde_json::Error> {
    // Steps without any meta decode as an empty object so defaulted fields apply.
    let meta = if meta.is_null() { Value::Object(Default::default()) } else { meta };
    Ok(match kind {
        StepKind::FindRecord => StepConfig::FindRecord(serde_json::from_value(meta)?),
        StepKind::If => StepConfig::If(serde_json::from_value(meta)?),
        StepKind::CreatePdf => StepConfig::CreatePdf(serde_json::from_value(meta)?),
        StepKind::SendEmail => StepConfig::SendEmail(serde_json::from_value(meta)?),
        StepKind::ApiCall => StepConfig::ApiCall(serde_json::from_value(meta)?),
        StepKind::UpdateRecord => StepConfig::UpdateRecord(serde_json::from_value(meta)?),
    })
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        let kind = step.config.type_name().to_string();
        let meta = match step.config {
            StepConfig::FindRecord(meta) => serde_json::to_value(meta),
            StepConfig::If(meta) => serde_json::to_value(meta),
            StepConfig::CreatePdf(meta) => serde_json::to_value(meta),
            StepConfig::SendEmail(meta) => serde_json::to_value(meta),
            StepConfig::ApiCall(meta) => serde_json::to_value(meta),
            StepConfig::UpdateRecord(meta) => serde_json::to_value(meta),
            StepConfig::Unknown { meta, .. } => Ok(meta),
        }
        .unwrap_or_default();

        RawStep {
            label: step.label,
            name: step.name,
            kind,
            object: step.object,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::meta::ApiMethod;
    use serde_json::json;

    #[test]
    fn decodes_typed_steps_and_keeps_unknown_types() {
        let process: Process = serde_json::from_value(json!({
            "name": "onboarding",
            "steps": [
                {"label": "Find", "name": "customer", "type": "find_record", "object": "customers", "meta": {"conditions": {"statements": []}}},
                {"label": "Call", "name": "call", "type": "api_call", "object": "", "meta": {"api": {"url": "https://x", "type": "Get", "body": []}, "headers": []}},
                {"label": "Mystery", "name": "m", "type": "teleport", "object": "", "meta": {"to": "mars"}}
            ]
        }))
        .unwrap();

        assert_eq!(process.steps.len(), 3);
        assert_eq!(process.steps[0].kind(), Some(StepKind::FindRecord));
        match &process.steps[1].config {
            StepConfig::ApiCall(meta) => assert_eq!(meta.api.method, ApiMethod::Get),
            other => panic!("unexpected config: {other:?}"),
        }
        assert_eq!(process.steps[2].kind(), None);
        assert_eq!(process.steps[2].config.type_name(), "teleport");
    }

    #[test]
    fn accepts_steps_nested_under_meta() {
        let process: Process = serde_json::from_value(json!({
            "name": "legacy",
            "meta": {"steps": [{"label": "If", "name": "branch", "type": "if", "object": "", "meta": {"conditions": {"statements": []}, "steps": []}}]}
        }))
        .unwrap();

        assert_eq!(process.steps.len(), 1);
        assert_eq!(process.steps[0].kind(), Some(StepKind::If));
    }

    #[test]
    fn malformed_meta_names_the_step() {
        let error = serde_json::from_value::<Step>(json!({
            "label": "Update customer",
            "name": "updated",
            "type": "update_record",
            "object": "customers",
            "meta": {"fields": "not-a-list"}
        }))
        .unwrap_err();

        let message = error.to_string();
        assert!(message.contains("Update customer"), "unexpected error: {message}");
        assert!(message.contains("update_record"), "unexpected error: {message}");
    }

    #[test]
    fn steps_round_trip_through_wire_shape() {
        let step: Step = serde_json::from_value(json!({
            "label": "Branch",
            "name": "branch",
            "type": "if",
            "object": "",
            "meta": {
                "conditions": {"statements": [{"lhs": 1, "operator": "==", "rhs": 1}]},
                "steps": [{"label": "Mail", "name": "mailed", "type": "send_email", "object": "", "meta": {"email": {"to": {"type": "literal", "value": "a@b.c"}, "subject": "Hi", "message": "Hello"}}}]
            }
        }))
        .unwrap();

        let encoded = serde_json::to_value(&step).unwrap();
        assert_eq!(encoded["type"], "if");
        assert_eq!(encoded["meta"]["steps"][0]["type"], "send_email");
        let decoded: Step = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, step);
    }

    #[test]
    fn processes_decode_from_yaml() {
        let yaml = r#"
name: intake
steps:
  - label: Lookup
    name: found
    type: find_record
    object: customers
    meta:
      conditions:
        statements: []
"#;
        let process: Process = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(process.name, "intake");
        assert_eq!(process.steps[0].name, "found");
        assert_eq!(process.steps[0].object, "customers");
    }

    #[test]
    fn output_policy_splits_pool_writers_from_result_setters() {
        let writers: Vec<StepKind> = StepKind::ALL
            .into_iter()
            .filter(|kind| kind.output_policy() == OutputPolicy::WritePool)
            .collect();
        assert_eq!(writers, vec![StepKind::FindRecord, StepKind::SendEmail, StepKind::UpdateRecord]);
        assert_eq!("if".parse::<StepKind>().unwrap().output_policy(), OutputPolicy::SetResult);
    }
}
