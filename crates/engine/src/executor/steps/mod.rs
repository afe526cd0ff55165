//! One handler per step type.
//!
//! Handlers return a [`StepOutcome`](crate::outcome::StepOutcome) and never an
//! error: collaborator failures are logged here and folded into
//! `StepOutcome::Failed`.

pub(crate) mod api_call;
pub(crate) mod branch;
pub(crate) mod create_pdf;
pub(crate) mod find_record;
pub(crate) mod send_email;
pub(crate) mod update_record;

use std::borrow::Cow;

use workline_types::Condition;

/// The condition scoped to `object` when it names no collection itself.
pub(crate) fn scoped_condition<'a>(condition: &'a Condition, object: &str) -> Cow<'a, Condition> {
    if condition.object.is_some() || object.is_empty() {
        return Cow::Borrowed(condition);
    }
    let mut scoped = condition.clone();
    scoped.object = Some(object.to_string());
    Cow::Owned(scoped)
}
