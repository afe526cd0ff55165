//! The variable pool shared by every step of a run.
//!
//! A [`Pool`] is created once per run, handed to each step by `&mut`, and
//! dropped when the run returns. It is the only channel steps use to pass
//! data to later steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use workline_types::{PoolEntry, Variable};

/// Ordered name → entry mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pool {
    entries: IndexMap<String, PoolEntry>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool from a sequence of variables keyed by their `name`.
    /// When two variables share a name the later one wins.
    pub fn from_variables(variables: impl IntoIterator<Item = Variable>) -> Self {
        let mut pool = Self::new();
        for variable in variables {
            pool.set(variable.name.clone(), PoolEntry::Variable(variable));
        }
        pool
    }

    pub fn get(&self, name: &str) -> Option<&PoolEntry> {
        self.entries.get(name)
    }

    /// Stores `entry` under `name`, replacing any previous value of any shape.
    pub fn set(&mut self, name: impl Into<String>, entry: impl Into<PoolEntry>) {
        self.entries.insert(name.into(), entry.into());
    }

    /// The entry under `name` when it holds a variable.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.get(name).and_then(PoolEntry::as_variable)
    }

    /// Last variable in pool order whose own `name` equals `name`, regardless
    /// of the key it is stored under.
    pub fn find_variable_named(&self, name: &str) -> Option<&Variable> {
        self.entries
            .values()
            .rev()
            .filter_map(PoolEntry::as_variable)
            .find(|variable| variable.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PoolEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> IndexMap<String, PoolEntry> {
        self.entries
    }
}

impl From<IndexMap<String, PoolEntry>> for Pool {
    fn from(entries: IndexMap<String, PoolEntry>) -> Self {
        Self { entries }
    }
}

/// Initial pool input: either a sequence of variables or a ready mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolInput {
    Sequence(Vec<Variable>),
    Mapping(IndexMap<String, PoolEntry>),
}

impl Default for PoolInput {
    fn default() -> Self {
        PoolInput::Mapping(IndexMap::new())
    }
}

impl From<PoolInput> for Pool {
    fn from(input: PoolInput) -> Self {
        match input {
            PoolInput::Sequence(variables) => Pool::from_variables(variables),
            PoolInput::Mapping(entries) => Pool::from(entries),
        }
    }
}

impl From<Vec<Variable>> for PoolInput {
    fn from(variables: Vec<Variable>) -> Self {
        PoolInput::Sequence(variables)
    }
}

impl From<Pool> for PoolInput {
    fn from(pool: Pool) -> Self {
        PoolInput::Mapping(pool.into_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer(id: &str, email: &str) -> Variable {
        Variable::new(id, "customer", "customers").with_field("email", email)
    }

    #[test]
    fn sequence_input_keys_by_name_and_last_duplicate_wins() {
        let pool = Pool::from(PoolInput::Sequence(vec![
            customer("1", "first@example.com"),
            Variable::new("9", "order", "orders"),
            customer("2", "second@example.com"),
        ]));

        assert_eq!(pool.len(), 2);
        let winner = pool.variable("customer").expect("customer");
        assert_eq!(winner.id, "2");
        assert_eq!(winner.field("email"), Some(&json!("second@example.com")));
    }

    #[test]
    fn sequence_and_mapping_inputs_normalize_identically() {
        let from_sequence = Pool::from(PoolInput::Sequence(vec![customer("1", "a@example.com")]));

        let mut mapping = IndexMap::new();
        mapping.insert("customer".to_string(), PoolEntry::Variable(customer("1", "a@example.com")));
        let from_mapping = Pool::from(PoolInput::Mapping(mapping));

        assert_eq!(from_sequence, from_mapping);

        let customer_json = json!({"name": "customer", "object": "customers", "data": {"email": "a@example.com"}});
        let sequence: PoolInput = serde_json::from_value(json!([customer_json.clone()])).unwrap();
        let mapping: PoolInput = serde_json::from_value(json!({"customer": customer_json})).unwrap();
        let from_sequence = Pool::from(sequence);
        let from_mapping = Pool::from(mapping);

        assert!(from_mapping.variable("customer").is_some());
        assert_eq!(from_mapping.find_variable_named("customer"), from_sequence.find_variable_named("customer"));
        assert_eq!(from_sequence, from_mapping);
    }

    #[test]
    fn pool_input_decodes_both_json_shapes() {
        let sequence: PoolInput = serde_json::from_value(json!([
            {"_id": "1", "name": "customer", "object": "customers", "data": {"email": "a@example.com"}}
        ]))
        .unwrap();
        assert!(matches!(sequence, PoolInput::Sequence(_)));

        let mapping: PoolInput = serde_json::from_value(json!({
            "customer": {"_id": "1", "name": "customer", "object": "customers", "data": {}},
            "flag": false
        }))
        .unwrap();
        let pool = Pool::from(mapping);
        assert!(pool.variable("customer").is_some());
        assert_eq!(pool.get("flag"), Some(&PoolEntry::Failed));
    }

    #[test]
    fn set_overwrites_entries_of_any_shape() {
        let mut pool = Pool::from_variables(vec![customer("1", "a@example.com")]);
        pool.set("customer", PoolEntry::Failed);
        assert_eq!(pool.get("customer"), Some(&PoolEntry::Failed));
        assert!(pool.variable("customer").is_none());

        pool.set("customer", json!({"status": "ok"}));
        assert_eq!(pool.get("customer"), Some(&PoolEntry::Value(json!({"status": "ok"}))));
    }

    #[test]
    fn find_variable_named_scans_values() {
        let mut pool = Pool::new();
        pool.set("lookup", customer("7", "c@example.com"));
        assert_eq!(pool.find_variable_named("customer").map(|v| v.id.as_str()), Some("7"));
        assert!(pool.find_variable_named("lookup").is_none());

        pool.set("again", customer("8", "d@example.com"));
        assert_eq!(pool.find_variable_named("customer").map(|v| v.id.as_str()), Some("8"));
    }
}
