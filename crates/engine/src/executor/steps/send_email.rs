use serde_json::Value;
use tracing::{debug, warn};
use workline_types::{EmailRecipient, RecipientKind, SendEmailMeta};

use crate::collaborator::{Collaborators, OutgoingEmail};
use crate::outcome::StepOutcome;
use crate::pool::Pool;

/// Sends `meta.email` through the mailer. The step's value is `true` when the
/// mailer accepts the message.
pub(crate) async fn execute(meta: &SendEmailMeta, pool: &Pool, collaborators: &Collaborators) -> StepOutcome {
    let Some(recipient) = resolve_recipient(&meta.email.to, pool) else {
        warn!(recipient = ?meta.email.to.value, "could not resolve email recipient");
        return StepOutcome::Failed;
    };

    let email = OutgoingEmail {
        to: recipient,
        subject: meta.email.subject.clone().unwrap_or_default(),
        html: render_html(meta.email.message.as_deref().unwrap_or_default()),
        from: None,
    };

    match collaborators.mailer.send(&email).await {
        Ok(()) => {
            debug!(to = %email.to, "email sent");
            StepOutcome::value(true)
        }
        Err(error) => {
            warn!(to = %email.to, %error, "failed to send email");
            StepOutcome::Failed
        }
    }
}

fn render_html(message: &str) -> String {
    format!("<p> {message},</p>")
}

/// Address named by the recipient: `pool[name].data[field]` for variable
/// recipients, the literal otherwise. Empty addresses do not resolve.
fn resolve_recipient(recipient: &EmailRecipient, pool: &Pool) -> Option<String> {
    let address = match recipient.kind {
        RecipientKind::Literal => recipient.literal_address()?,
        RecipientKind::Variable => {
            let reference = recipient.variable_field().ok()?;
            match pool.variable(reference.variable.name())?.field(&reference.field)? {
                Value::String(address) => address.clone(),
                Value::Number(number) => number.to_string(),
                _ => return None,
            }
        }
    };
    let address = address.trim();
    (!address.is_empty()).then(|| address.to_string())
}
