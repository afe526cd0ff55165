use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use workline_types::{ApiCallMeta, ApiMethod, EntrySource, KeyValueEntry};

use crate::collaborator::{Collaborators, HttpMethod, HttpRequest};
use crate::outcome::StepOutcome;

/// Calls `meta.api.url`. The response body is the step's value when the
/// status is exactly 200; any other status, transport error or unsupported
/// method fails the step.
///
/// Only `literal` header and body entries are sent.
pub(crate) async fn execute(meta: &ApiCallMeta, collaborators: &Collaborators) -> StepOutcome {
    let method = match meta.api.method {
        ApiMethod::Get => HttpMethod::Get,
        ApiMethod::Post => HttpMethod::Post,
        ApiMethod::Unsupported => {
            warn!(url = %meta.api.url, "unsupported api call method");
            return StepOutcome::Failed;
        }
    };

    let request = HttpRequest {
        method,
        url: meta.api.url.clone(),
        headers: literal_headers(&meta.headers),
        body: literal_body(&meta.api.body),
    };

    match collaborators.http.request(&request).await {
        Ok(response) if response.status == 200 => {
            debug!(%method, url = %request.url, "api call succeeded");
            StepOutcome::value(response.body)
        }
        Ok(response) => {
            warn!(%method, url = %request.url, status = response.status, "api call returned non-200 status");
            StepOutcome::Failed
        }
        Err(error) => {
            warn!(%method, url = %request.url, %error, "api call failed");
            StepOutcome::Failed
        }
    }
}

fn literal_entries(entries: &[KeyValueEntry]) -> impl Iterator<Item = &KeyValueEntry> {
    entries.iter().filter(|entry| entry.source == EntrySource::Literal)
}

fn literal_headers(entries: &[KeyValueEntry]) -> IndexMap<String, String> {
    literal_entries(entries)
        .map(|entry| {
            let value = match &entry.value {
                Value::String(text) => text.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (entry.key.clone(), value)
        })
        .collect()
}

fn literal_body(entries: &[KeyValueEntry]) -> Map<String, Value> {
    literal_entries(entries)
        .map(|entry| (entry.key.clone(), entry.value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_literal_entries_are_sent() {
        let entries = vec![
            KeyValueEntry::literal("Authorization", "Bearer abc"),
            KeyValueEntry {
                source: EntrySource::Variable,
                key: "X-Customer".into(),
                value: json!("customer.email"),
            },
            KeyValueEntry::literal("Retries", 3),
        ];

        let headers = literal_headers(&entries);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["Authorization"], "Bearer abc");
        assert_eq!(headers["Retries"], "3");

        let body = literal_body(&entries);
        assert_eq!(body.get("Retries"), Some(&json!(3)));
        assert!(!body.contains_key("X-Customer"));
    }
}
