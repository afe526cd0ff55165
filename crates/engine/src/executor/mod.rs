//! Step interpreter: runs a process's steps in order against one pool.
//!
//! Each step is dispatched to its handler in [`steps`], then its outcome is
//! folded into the run according to [`StepKind::output_policy`]: pool-writing
//! steps store their output under the step's `name`, result-setting steps
//! replace the run's last result. Handlers cannot fail the loop; a failing
//! step leaves `false` behind and the next step runs.

mod steps;

use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};
use workline_types::{OutputPolicy, Process, Step, StepConfig};

use crate::collaborator::Collaborators;
use crate::outcome::{LastResult, RunResult, StepOutcome};
use crate::pool::Pool;

/// Executes processes against a fixed set of collaborators.
#[derive(Debug, Clone)]
pub struct Interpreter {
    collaborators: Collaborators,
}

impl Interpreter {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Runs every step of `process` against `pool` and returns the run's
    /// result. The pool keeps every write made during the run.
    pub async fn run_process(&self, process: &Process, pool: &mut Pool) -> RunResult {
        info!(process = %process.name, step_count = process.steps.len(), "process run started");
        let result = self.run_steps(&process.steps, pool).await;
        info!(process = %process.name, pool_size = pool.len(), "process run finished");
        result
    }

    /// Runs `steps` in order. Nested `if` steps re-enter here with the same
    /// pool, so the future is boxed.
    pub(crate) fn run_steps<'a>(&'a self, steps: &'a [Step], pool: &'a mut Pool) -> BoxFuture<'a, RunResult> {
        Box::pin(async move {
            let mut last_result: Option<LastResult> = None;

            for (index, step) in steps.iter().enumerate() {
                info!(index, step = %step.label, kind = %step.config.type_name(), "step started");

                let Some(kind) = step.kind() else {
                    warn!(index, step = %step.label, kind = %step.config.type_name(), "unknown step type; skipping");
                    continue;
                };

                let outcome = self.execute_step(step, pool).await;
                if outcome.is_failed() {
                    warn!(index, step = %step.label, %kind, "step failed");
                } else {
                    debug!(index, step = %step.label, %kind, "step succeeded");
                }

                match kind.output_policy() {
                    OutputPolicy::WritePool => {
                        let entry = outcome.into_pool_entry(pool);
                        pool.set(step.name.clone(), entry);
                    }
                    OutputPolicy::SetResult => last_result = Some(LastResult::from_outcome(outcome)),
                }
            }

            last_result.map_or(RunResult::Completed, |last_result| last_result.into_run_result(pool))
        })
    }

    async fn execute_step(&self, step: &Step, pool: &mut Pool) -> StepOutcome {
        let collaborators = &self.collaborators;
        match &step.config {
            StepConfig::FindRecord(meta) => steps::find_record::execute(step, meta, pool, collaborators).await,
            StepConfig::UpdateRecord(meta) => steps::update_record::execute(meta, pool, collaborators).await,
            StepConfig::CreatePdf(meta) => steps::create_pdf::execute(meta, pool, collaborators).await,
            StepConfig::SendEmail(meta) => steps::send_email::execute(meta, pool, collaborators).await,
            StepConfig::ApiCall(meta) => steps::api_call::execute(meta, collaborators).await,
            StepConfig::If(meta) => steps::branch::execute(self, step, meta, pool).await,
            // Filtered out by `run_steps`.
            StepConfig::Unknown { .. } => StepOutcome::Failed,
        }
    }
}
