//! Pool values: persisted-record shaped [`Variable`]s and the [`PoolEntry`]
//! wrapper that also carries failure markers and raw handler output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A record-shaped pool value.
///
/// Variables are what the initial pool is made of and what record lookups
/// return. `data` holds the record's user fields in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Identifier of the persisted record backing this variable.
    #[serde(rename = "_id", default, deserialize_with = "deserialize_identifier")]
    pub id: String,
    /// Variable name; the pool key when the variable arrives in a sequence.
    #[serde(default)]
    pub name: String,
    /// Record collection (object type) the variable belongs to.
    #[serde(default)]
    pub object: String,
    /// Field values keyed by field name.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Variable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object: object.into(),
            data: Map::new(),
        }
    }

    /// Builder-style helper used by fixtures and stores.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Returns the value stored under `field`, if any.
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Accepts string, integer and `{"$oid": "..."}` identifiers.
fn deserialize_identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(identifier) => Ok(identifier),
        Value::Number(number) => Ok(number.to_string()),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(identifier)) => Ok(identifier.clone()),
            _ => Err(serde::de::Error::custom("record identifier object must contain a string '$oid'")),
        },
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "record identifier must be a string or number, got {other}"
        ))),
    }
}

/// One slot of the variable pool.
///
/// The pool is untyped: a slot may hold a [`Variable`], the failure sentinel
/// left behind by a failed step, or whatever raw value a handler produced.
/// `Failed` serializes as `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Variable(Variable),
    Failed,
    Value(Value),
}

impl PoolEntry {
    /// Returns the entry as a variable when it holds one.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PoolEntry::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PoolEntry::Failed)
    }

    /// Truthiness with the usual dynamic-language rules: `false`, `null`, `0`
    /// and `""` are falsy, every other value (including empty containers) is
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PoolEntry::Variable(_) => true,
            PoolEntry::Failed => false,
            PoolEntry::Value(value) => value_is_truthy(value),
        }
    }

    /// Converts the entry into its JSON representation.
    pub fn to_value(&self) -> Value {
        match self {
            PoolEntry::Variable(variable) => serde_json::to_value(variable).unwrap_or_default(),
            PoolEntry::Failed => Value::Bool(false),
            PoolEntry::Value(value) => value.clone(),
        }
    }
}

/// Truthiness of a raw JSON value, see [`PoolEntry::is_truthy`].
pub fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<Variable> for PoolEntry {
    fn from(variable: Variable) -> Self {
        PoolEntry::Variable(variable)
    }
}

impl From<Value> for PoolEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(false) => PoolEntry::Failed,
            Value::Object(ref map) if looks_like_variable(map) => match serde_json::from_value::<Variable>(value.clone()) {
                Ok(variable) => PoolEntry::Variable(variable),
                Err(_) => PoolEntry::Value(value),
            },
            other => PoolEntry::Value(other),
        }
    }
}

/// Objects carrying a `name` or `data` key decode the way sequence elements
/// do, with `_id` and the other fields defaulted.
fn looks_like_variable(map: &Map<String, Value>) -> bool {
    map.contains_key("name") || map.contains_key("data")
}

impl Serialize for PoolEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PoolEntry::Variable(variable) => variable.serialize(serializer),
            PoolEntry::Failed => serializer.serialize_bool(false),
            PoolEntry::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PoolEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(PoolEntry::from)
    }
}

/// Authoring-tool selection of a pool variable: `{ text, value: { name, object } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSelector {
    /// Display text shown by the authoring UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub value: VariableHandle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableHandle {
    /// Pool key of the selected variable.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

/// Reference to a pool variable, either `{ name }` or the nested selector
/// shape `{ name: { value: { name } } }` emitted by the authoring UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableReference {
    Named { name: String },
    Selected { name: VariableSelector },
}

impl VariableReference {
    /// Pool key the reference points at.
    pub fn name(&self) -> &str {
        match self {
            VariableReference::Named { name } => name,
            VariableReference::Selected { name } => &name.value.name,
        }
    }
}

/// A single field of a pool variable: `pool[variable].data[field]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableField {
    pub variable: VariableReference,
    pub field: String,
}
