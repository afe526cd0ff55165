//! Side-effect free collaborators for dry runs and previews.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use super::{
    FormDocument, HttpClient, HttpError, HttpRequest, HttpResponse, MailError, Mailer, OutgoingEmail, RenderError, TemplateRenderer,
};

/// Logs the message instead of sending it and reports success.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "dry run: email not sent");
        Ok(())
    }
}

/// Answers every request with status 200 and a body echoing the request.
pub struct NoopHttpClient;

#[async_trait]
impl HttpClient for NoopHttpClient {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        info!(method = %request.method, url = %request.url, "dry run: request not sent");
        let mut echo = Map::new();
        echo.insert("method".into(), Value::String(request.method.to_string()));
        echo.insert("url".into(), Value::String(request.url.clone()));
        echo.insert("body".into(), Value::Object(request.body.clone()));
        Ok(HttpResponse {
            status: 200,
            body: Value::Object(echo),
        })
    }
}

/// Accepts any template and discards the rendered output.
pub struct NoopRenderer;

#[async_trait]
impl TemplateRenderer for NoopRenderer {
    async fn load(&self, template: &str) -> Result<Box<dyn FormDocument>, RenderError> {
        info!(template, "dry run: template not loaded");
        Ok(Box::new(NoopForm::default()))
    }

    async fn store(&self, destination: &str, bytes: Vec<u8>) -> Result<(), RenderError> {
        info!(destination, size = bytes.len(), "dry run: document not stored");
        Ok(())
    }
}

/// A form that records the fields set on it.
#[derive(Debug, Default)]
pub struct NoopForm {
    fields: Map<String, Value>,
}

impl FormDocument for NoopForm {
    fn set_text_field(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        self.fields.insert(name.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn flatten(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec(&self.fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::HttpMethod;
    use indexmap::IndexMap;
    use serde_json::json;

    #[tokio::test]
    async fn noop_http_client_echoes_request() {
        let mut body = Map::new();
        body.insert("name".into(), json!("demo"));
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: "https://example.com/hooks".into(),
            headers: IndexMap::new(),
            body,
        };

        let response = NoopHttpClient.request(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["method"], "POST");
        assert_eq!(response.body["body"]["name"], "demo");
    }

    #[tokio::test]
    async fn noop_mailer_always_succeeds() {
        let email = OutgoingEmail {
            to: "ops@example.com".into(),
            subject: "Hi".into(),
            html: "<p> Hello,</p>".into(),
            from: None,
        };
        assert!(NoopMailer.send(&email).await.is_ok());
    }

    #[tokio::test]
    async fn noop_renderer_serializes_filled_fields() {
        let mut form = NoopRenderer.load("invoice.pdf").await.unwrap();
        form.set_text_field("name", "Ada").unwrap();
        form.flatten().unwrap();
        let bytes = form.save().unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"name": "Ada"}));
        assert!(NoopRenderer.store("out.pdf", bytes).await.is_ok());
    }
}
