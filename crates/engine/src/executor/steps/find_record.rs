use tracing::{debug, warn};
use workline_types::{FindRecordMeta, Step};

use super::scoped_condition;
use crate::collaborator::Collaborators;
use crate::outcome::StepOutcome;
use crate::pool::Pool;

/// Looks a record up through the condition evaluator. A matched record or a
/// `true` evaluation is the step's value; anything else fails the step.
pub(crate) async fn execute(step: &Step, meta: &FindRecordMeta, pool: &Pool, collaborators: &Collaborators) -> StepOutcome {
    let condition = scoped_condition(&meta.conditions, &step.object);
    match collaborators.conditions.evaluate(&condition, pool).await {
        Ok(evaluation) if evaluation.is_truthy() => StepOutcome::Succeeded(evaluation.into_pool_entry()),
        Ok(_) => {
            debug!(step = %step.label, object = ?condition.object, "no record matched");
            StepOutcome::Failed
        }
        Err(error) => {
            warn!(step = %step.label, %error, "record lookup failed");
            StepOutcome::Failed
        }
    }
}
