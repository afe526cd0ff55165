//! Interfaces to the external collaborators steps call out to.
//!
//! The interpreter only knows these traits. Concrete implementations live in
//! other crates (`workline-api` for HTTP and SMTP, `workline-render` for PDF
//! templates) or in [`crate::store`] for records and processes. The no-op
//! implementations in [`noop`] support dry runs and previews.
//!
//! Timeouts belong to the implementations; the interpreter awaits every call
//! to completion.

pub mod noop;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::conditions::ConditionEvaluator;
use crate::store::RecordStore;

pub use noop::{NoopHttpClient, NoopMailer, NoopRenderer};

/// A message handed to the [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// When `None` the mailer applies its configured default sender.
    pub from: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build email message: {0}")]
    Build(String),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail rejected by server: {0}")]
    Rejected(String),
}

/// Sends email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// An outbound HTTP call built by the `api_call` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    /// Sent as a JSON object.
    pub body: Map<String, Value>,
}

/// Response status and decoded body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    /// JSON when the body parses as JSON, otherwise the raw text as a string.
    pub body: Value,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Transport(String),
}

/// Performs HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("template is not a fillable form: {0}")]
    NotAForm(String),

    #[error("form field '{0}' not found")]
    FieldNotFound(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An editable form loaded from a template.
pub trait FormDocument: Send {
    fn set_text_field(&mut self, name: &str, value: &str) -> Result<(), RenderError>;

    /// Makes every field non-editable.
    fn flatten(&mut self) -> Result<(), RenderError>;

    fn save(&mut self) -> Result<Vec<u8>, RenderError>;
}

/// Loads form templates and persists rendered documents.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn load(&self, template: &str) -> Result<Box<dyn FormDocument>, RenderError>;

    /// Persists rendered bytes under `destination`.
    async fn store(&self, destination: &str, bytes: Vec<u8>) -> Result<(), RenderError>;
}

/// The set of collaborators a run may call.
///
/// Each field is a shared trait object, so one `Collaborators` value can back
/// any number of concurrent runs.
#[derive(Clone)]
pub struct Collaborators {
    pub records: Arc<dyn RecordStore>,
    pub conditions: Arc<dyn ConditionEvaluator>,
    pub mailer: Arc<dyn Mailer>,
    pub http: Arc<dyn HttpClient>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl Collaborators {
    pub fn new(
        records: Arc<dyn RecordStore>,
        conditions: Arc<dyn ConditionEvaluator>,
        mailer: Arc<dyn Mailer>,
        http: Arc<dyn HttpClient>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            records,
            conditions,
            mailer,
            http,
            renderer,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
