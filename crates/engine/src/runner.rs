//! Entry point for running stored processes by name.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use workline_types::Process;

use crate::collaborator::Collaborators;
use crate::executor::Interpreter;
use crate::outcome::RunResult;
use crate::pool::{Pool, PoolInput};
use crate::store::{ProcessStore, StoreError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("process '{0}' not found")]
    ProcessNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Looks processes up by name and runs each against a fresh pool.
#[derive(Clone)]
pub struct ProcessRunner {
    processes: Arc<dyn ProcessStore>,
    interpreter: Interpreter,
}

impl ProcessRunner {
    pub fn new(processes: Arc<dyn ProcessStore>, collaborators: Collaborators) -> Self {
        Self {
            processes,
            interpreter: Interpreter::new(collaborators),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Runs the process stored under `name` with `input` as its initial pool.
    pub async fn run_named(&self, name: &str, input: impl Into<PoolInput>) -> Result<RunResult, RunnerError> {
        let process = self
            .processes
            .get_process_by_name(name)
            .await?
            .ok_or_else(|| RunnerError::ProcessNotFound(name.to_string()))?;
        Ok(self.run(&process, input).await)
    }

    /// Runs an already loaded process. The pool is dropped when the run ends.
    pub async fn run(&self, process: &Process, input: impl Into<PoolInput>) -> RunResult {
        let mut pool = Pool::from(input.into());
        info!(process = %process.name, initial_variables = pool.len(), "running process");
        self.interpreter.run_process(process, &mut pool).await
    }
}
