use tracing::{debug, warn};
use workline_types::{PoolEntry, UpdateRecordMeta};

use crate::collaborator::Collaborators;
use crate::outcome::StepOutcome;
use crate::pool::Pool;

/// Applies `meta.fields` to the stored record behind a pool variable and
/// persists it. The updated record is the step's value.
pub(crate) async fn execute(meta: &UpdateRecordMeta, pool: &Pool, collaborators: &Collaborators) -> StepOutcome {
    let variable_name = meta.variable.value.name.as_str();
    let Some(record_id) = pool.variable(variable_name).map(|variable| variable.id.clone()) else {
        debug!(variable = variable_name, "update target is not a variable in the pool");
        return StepOutcome::Failed;
    };

    let mut record = match collaborators.records.find_one(&record_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(variable = variable_name, record = %record_id, "record not found");
            return StepOutcome::Failed;
        }
        Err(error) => {
            warn!(variable = variable_name, record = %record_id, %error, "record lookup failed");
            return StepOutcome::Failed;
        }
    };

    for assignment in &meta.fields {
        record.data.insert(assignment.text.clone(), assignment.value.clone());
    }

    match collaborators.records.update_one(&record_id, &record).await {
        Ok(()) => StepOutcome::Succeeded(PoolEntry::Variable(record)),
        Err(error) => {
            warn!(variable = variable_name, record = %record_id, %error, "record update failed");
            StepOutcome::Failed
        }
    }
}
