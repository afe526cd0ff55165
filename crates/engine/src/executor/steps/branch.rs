use tracing::{debug, warn};
use workline_types::{IfMeta, Step};

use super::scoped_condition;
use crate::executor::Interpreter;
use crate::outcome::{RunResult, StepOutcome};
use crate::pool::Pool;

/// Runs `meta.steps` against the same pool when the condition holds.
///
/// The nested run's payload becomes the step's value when it has content
/// (a non-empty string or array). Otherwise, and whenever the condition does
/// not hold, the step's value is the pool itself.
pub(crate) async fn execute(interpreter: &Interpreter, step: &Step, meta: &IfMeta, pool: &mut Pool) -> StepOutcome {
    let condition = scoped_condition(&meta.conditions, &step.object);
    let holds = match interpreter.collaborators().conditions.evaluate(&condition, pool).await {
        Ok(evaluation) => evaluation.is_truthy(),
        Err(error) => {
            warn!(step = %step.label, %error, "branch condition could not be evaluated; treating as false");
            false
        }
    };

    if !holds {
        debug!(step = %step.label, "branch condition is false");
        return StepOutcome::Pool;
    }

    debug!(step = %step.label, nested_steps = meta.steps.len(), "branch condition holds; running nested steps");
    let nested = interpreter.run_steps(&meta.steps, pool).await;
    let has_content = nested.has_content();
    match nested {
        RunResult::Payload(payload) if has_content => StepOutcome::value(payload),
        _ => StepOutcome::Pool,
    }
}
