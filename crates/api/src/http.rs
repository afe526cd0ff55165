use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;
use tracing::debug;
use workline_engine::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
use workline_util::{HttpSettings, redact_header_value, redact_sensitive};

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    http: Client,
}

impl ReqwestHttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, HttpError> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json, text/plain, */*"));

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!("workline/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|error| HttpError::InvalidRequest(format!("build http client: {error}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            debug!(header = %name, value = %redact_header_value(name, value), "request header");
            builder = builder.header(name.as_str(), value.as_str());
        }
        // GET requests only carry a body when one was configured.
        if request.method == HttpMethod::Post || !request.body.is_empty() {
            builder = builder.json(&request.body);
        }

        debug!(method = %request.method, url = %redact_sensitive(&request.url), "sending request");
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_reqwest_error)?;
        debug!(method = %request.method, url = %redact_sensitive(&request.url), status, "received response");

        Ok(HttpResponse {
            status,
            body: decode_body(text),
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> HttpError {
    let message = redact_sensitive(&error.to_string());
    if error.is_timeout() {
        HttpError::Timeout(message)
    } else if error.is_builder() {
        HttpError::InvalidRequest(message)
    } else {
        HttpError::Transport(message)
    }
}

/// JSON when the body parses as JSON, the raw text otherwise, `null` when
/// empty.
fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
