//! File-backed stores used by the CLI.

use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use workline_types::{Process, Variable};

use super::{ProcessStore, RecordStore, StoreError};

const PROCESS_FILE_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Loads every process defined in a JSON or YAML file.
///
/// A file holds either a single process or a bundle under a `processes` key.
/// YAML parsing is used for both formats since JSON documents are valid YAML.
pub fn load_process_file(file_path: impl AsRef<Path>) -> Result<Vec<Process>, StoreError> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).map_err(|source| StoreError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    parse_process_document(&content).map_err(|message| StoreError::Decode {
        path: file_path.to_path_buf(),
        message,
    })
}

fn parse_process_document(content: &str) -> Result<Vec<Process>, String> {
    #[derive(Deserialize)]
    struct ProcessBundle {
        processes: Vec<Process>,
    }

    let document: serde_yaml::Value = serde_yaml::from_str(content).map_err(|error| error.to_string())?;
    let is_bundle = document
        .as_mapping()
        .is_some_and(|mapping| mapping.contains_key("processes"));

    if is_bundle {
        let bundle: ProcessBundle = serde_yaml::from_value(document).map_err(|error| error.to_string())?;
        return Ok(bundle.processes);
    }

    let process: Process = serde_yaml::from_value(document).map_err(|error| error.to_string())?;
    Ok(vec![process])
}

/// Process definitions read from the `*.json`, `*.yaml` and `*.yml` files of a
/// directory. The directory is rescanned on every lookup.
#[derive(Debug, Clone)]
pub struct DirectoryProcessStore {
    directory: PathBuf,
}

impl DirectoryProcessStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn load_all(&self) -> Result<Vec<Process>, StoreError> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || scan_process_directory(&directory))
            .await
            .map_err(|error| StoreError::Io {
                path: self.directory.clone(),
                source: std::io::Error::other(error),
            })?
    }
}

fn scan_process_directory(directory: &Path) -> Result<Vec<Process>, StoreError> {
    if !directory.exists() {
        debug!(directory = %directory.display(), "process directory does not exist");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(directory).map_err(|source| StoreError::Io {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| PROCESS_FILE_EXTENSIONS.contains(&extension))
        })
        .collect();
    files.sort();

    let mut processes: Vec<Process> = Vec::new();
    for file in files {
        for process in load_process_file(&file)? {
            if processes.iter().any(|existing| existing.name == process.name) {
                warn!(process = %process.name, file = %file.display(), "duplicate process name; keeping the first definition");
                continue;
            }
            processes.push(process);
        }
    }
    Ok(processes)
}

#[async_trait]
impl ProcessStore for DirectoryProcessStore {
    async fn get_process_by_name(&self, name: &str) -> Result<Option<Process>, StoreError> {
        Ok(self.load_all().await?.into_iter().find(|process| process.name == name))
    }

    async fn list_processes(&self) -> Result<Vec<Process>, StoreError> {
        self.load_all().await
    }
}

/// Records persisted as a JSON array in a single file.
///
/// Every call reads the file; updates rewrite it through a temporary file in
/// the same directory. A missing file reads as an empty store.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Vec<Variable>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|error| StoreError::Decode {
            path: self.path.clone(),
            message: error.to_string(),
        })
    }

    async fn write_records(&self, records: &[Variable]) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(records)?;
        let temporary_path = self.path.with_extension("json.tmp");
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&temporary_path, payload).await.map_err(io_error)?;
        tokio::fs::rename(&temporary_path, &self.path).await.map_err(io_error)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn find_one(&self, id: &str) -> Result<Option<Variable>, StoreError> {
        Ok(self.read_records().await?.into_iter().find(|record| record.id == id))
    }

    async fn update_one(&self, id: &str, record: &Variable) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        let existing = records
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
        *existing = record.clone();
        self.write_records(&records).await
    }

    async fn list(&self, object: Option<&str>) -> Result<Vec<Variable>, StoreError> {
        let records = self.read_records().await?;
        Ok(records
            .into_iter()
            .filter(|record| object.is_none_or(|object| record.object == object))
            .collect())
    }
}
