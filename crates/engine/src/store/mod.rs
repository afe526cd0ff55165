//! Record and process stores.
//!
//! The interpreter reads and writes records only through [`RecordStore`] and
//! resolves processes by name through [`ProcessStore`]. In-memory stores back
//! tests and embedding callers; the file-backed stores back the CLI.

mod file;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use workline_types::{Process, Variable};

pub use file::{DirectoryProcessStore, JsonFileRecordStore, load_process_file};
pub use memory::{InMemoryProcessStore, InMemoryRecordStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("record '{0}' not found")]
    RecordNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted records addressed by identifier.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_one(&self, id: &str) -> Result<Option<Variable>, StoreError>;

    /// Replaces the record stored under `id`.
    async fn update_one(&self, id: &str, record: &Variable) -> Result<(), StoreError>;

    /// Records in store order, optionally restricted to one collection.
    async fn list(&self, object: Option<&str>) -> Result<Vec<Variable>, StoreError>;
}

/// Process definitions addressed by name.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn get_process_by_name(&self, name: &str) -> Result<Option<Process>, StoreError>;

    async fn list_processes(&self) -> Result<Vec<Process>, StoreError>;
}
