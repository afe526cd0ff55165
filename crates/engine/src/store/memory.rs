use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use workline_types::{Process, Variable};

use super::{ProcessStore, RecordStore, StoreError};

/// Records held in memory, keyed by identifier in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<IndexMap<String, Variable>>,
}

impl InMemoryRecordStore {
    pub fn new(records: impl IntoIterator<Item = Variable>) -> Self {
        let records = records.into_iter().map(|record| (record.id.clone(), record)).collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn insert(&self, record: Variable) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    /// Copy of every stored record.
    pub async fn snapshot(&self) -> Vec<Variable> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_one(&self, id: &str) -> Result<Option<Variable>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update_one(&self, id: &str, record: &Variable) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::RecordNotFound(id.to_string())),
        }
    }

    async fn list(&self, object: Option<&str>) -> Result<Vec<Variable>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| object.is_none_or(|object| record.object == object))
            .cloned()
            .collect())
    }
}

/// Processes held in memory, keyed by name.
#[derive(Debug, Default)]
pub struct InMemoryProcessStore {
    processes: IndexMap<String, Process>,
}

impl InMemoryProcessStore {
    pub fn new(processes: impl IntoIterator<Item = Process>) -> Self {
        Self {
            processes: processes.into_iter().map(|process| (process.name.clone(), process)).collect(),
        }
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn get_process_by_name(&self, name: &str) -> Result<Option<Process>, StoreError> {
        Ok(self.processes.get(name).cloned())
    }

    async fn list_processes(&self) -> Result<Vec<Process>, StoreError> {
        Ok(self.processes.values().cloned().collect())
    }
}
