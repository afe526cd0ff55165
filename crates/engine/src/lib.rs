//! # Workline Engine
//!
//! Interprets stored processes: ordered lists of typed steps that share a
//! variable pool. Each step looks up or updates a record, branches on a
//! condition, sends an email, calls an HTTP API or fills a PDF form; the run
//! returns the value of the last result-setting step, or `true`.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use workline_engine::{
//!     Collaborators, InMemoryProcessStore, InMemoryRecordStore, NoopHttpClient, NoopMailer, NoopRenderer, PoolInput,
//!     ProcessRunner, RunResult, StoreConditionEvaluator,
//! };
//! use workline_types::Process;
//!
//! # tokio::runtime::Runtime::new()?.block_on(async {
//! let records = Arc::new(InMemoryRecordStore::default());
//! let collaborators = Collaborators::new(
//!     records.clone(),
//!     Arc::new(StoreConditionEvaluator::new(records)),
//!     Arc::new(NoopMailer),
//!     Arc::new(NoopHttpClient),
//!     Arc::new(NoopRenderer),
//! );
//! let process: Process = serde_json::from_str(r#"{"name": "empty", "steps": []}"#)?;
//! let runner = ProcessRunner::new(Arc::new(InMemoryProcessStore::new([process])), collaborators);
//!
//! let result = runner.run_named("empty", PoolInput::default()).await?;
//! assert_eq!(result, RunResult::Completed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`pool`**: the per-run variable pool and its initial input shapes
//! - **`executor`**: the step interpreter and one handler per step type
//! - **`conditions`**: condition evaluation over the pool and record store
//! - **`collaborator`**: mailer, HTTP and template renderer interfaces
//! - **`store`**: record and process stores
//! - **`runner`**: looks processes up by name and runs them

pub mod collaborator;
pub mod conditions;
pub mod executor;
pub mod outcome;
pub mod pool;
pub mod runner;
pub mod store;

pub use collaborator::{
    Collaborators, FormDocument, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, MailError, Mailer, NoopHttpClient,
    NoopMailer, NoopRenderer, OutgoingEmail, RenderError, TemplateRenderer,
};
pub use conditions::{ConditionError, ConditionEvaluator, Evaluation, StoreConditionEvaluator};
pub use executor::Interpreter;
pub use outcome::{RunResult, StepOutcome};
pub use pool::{Pool, PoolInput};
pub use runner::{ProcessRunner, RunnerError};
pub use store::{
    DirectoryProcessStore, InMemoryProcessStore, InMemoryRecordStore, JsonFileRecordStore, ProcessStore, RecordStore, StoreError,
    load_process_file,
};
