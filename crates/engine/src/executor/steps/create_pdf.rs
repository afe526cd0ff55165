use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, warn};
use workline_types::CreatePdfMeta;

use crate::collaborator::Collaborators;
use crate::outcome::StepOutcome;
use crate::pool::Pool;

/// Fills a form template from a pool variable, flattens it and stores it as
/// `{millis}_{variable}.pdf`. The step's value is `{ "file": name }`.
///
/// Per-field failures are logged and skipped; a missing source variable, an
/// unreadable template or a failed save fails the step.
pub(crate) async fn execute(meta: &CreatePdfMeta, pool: &Pool, collaborators: &Collaborators) -> StepOutcome {
    let variable_name = meta.object.value.as_str();
    let Some(source) = pool.find_variable_named(variable_name) else {
        debug!(variable = variable_name, "pdf source variable not found in pool");
        return StepOutcome::Failed;
    };

    let mut document = match collaborators.renderer.load(&meta.template.path).await {
        Ok(document) => document,
        Err(error) => {
            warn!(template = %meta.template.path, %error, "failed to load pdf template");
            return StepOutcome::Failed;
        }
    };

    for (field, _) in meta.fields.iter().filter(|(_, included)| **included) {
        let Some(value) = source.field(field) else {
            warn!(field = %field, variable = variable_name, "source variable has no value for form field");
            continue;
        };
        if let Err(error) = document.set_text_field(field, &field_text(value)) {
            warn!(field = %field, %error, "failed to set form field");
        }
    }

    let bytes = match document.flatten().and_then(|()| document.save()) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(template = %meta.template.path, %error, "failed to render pdf");
            return StepOutcome::Failed;
        }
    };

    let file_name = format!("{}_{}.pdf", Utc::now().timestamp_millis(), variable_name);
    match collaborators.renderer.store(&file_name, bytes).await {
        Ok(()) => StepOutcome::value(json!({ "file": file_name })),
        Err(error) => {
            warn!(file = %file_name, %error, "failed to store rendered pdf");
            StepOutcome::Failed
        }
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_text_renders_scalars_plainly() {
        assert_eq!(field_text(&json!("Ada")), "Ada");
        assert_eq!(field_text(&json!(42)), "42");
        assert_eq!(field_text(&Value::Null), "");
        assert_eq!(field_text(&json!(true)), "true");
    }
}
