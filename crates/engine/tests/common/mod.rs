#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use workline_engine::{
    Collaborators, ConditionError, ConditionEvaluator, Evaluation, FormDocument, HttpClient, HttpError, HttpRequest, HttpResponse,
    InMemoryRecordStore, Interpreter, MailError, Mailer, OutgoingEmail, Pool, RecordStore, RenderError, StoreError,
    TemplateRenderer,
};
use workline_types::{Condition, Process, Variable};

/// Answers evaluations from a queue; an empty queue answers `false`.
#[derive(Default)]
pub struct ScriptedEvaluator {
    answers: Mutex<VecDeque<Evaluation>>,
    pub calls: Mutex<Vec<Condition>>,
}

impl ScriptedEvaluator {
    pub fn answering(answers: impl IntoIterator<Item = Evaluation>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            calls: Mutex::default(),
        }
    }
}

#[async_trait]
impl ConditionEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, condition: &Condition, _pool: &Pool) -> Result<Evaluation, ConditionError> {
        self.calls.lock().unwrap().push(condition.clone());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(Evaluation::Truth(false)))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub reject: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.reject {
            return Err(MailError::Rejected("550 mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Replies with a fixed status and body, or a transport error when `status`
/// is `None`.
pub struct StubHttpClient {
    pub status: Option<u16>,
    pub body: Value,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl StubHttpClient {
    pub fn replying(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body,
            requests: Mutex::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            status: None,
            body: Value::Null,
            requests: Mutex::default(),
        }
    }
}

#[async_trait]
impl HttpClient for StubHttpClient {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.status {
            Some(status) => Ok(HttpResponse {
                status,
                body: self.body.clone(),
            }),
            None => Err(HttpError::Transport("connection refused".into())),
        }
    }
}

/// Serves templates with a fixed set of form fields and keeps stored files
/// in memory.
#[derive(Default)]
pub struct FakeRenderer {
    pub templates: IndexMap<String, Vec<String>>,
    pub loaded: Mutex<Vec<String>>,
    pub stored: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl FakeRenderer {
    pub fn with_template(mut self, path: &str, fields: &[&str]) -> Self {
        self.templates
            .insert(path.to_string(), fields.iter().map(|field| field.to_string()).collect());
        self
    }

    pub fn stored_names(&self) -> Vec<String> {
        self.stored.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait]
impl TemplateRenderer for FakeRenderer {
    async fn load(&self, template: &str) -> Result<Box<dyn FormDocument>, RenderError> {
        self.loaded.lock().unwrap().push(template.to_string());
        let fields = self
            .templates
            .get(template)
            .ok_or_else(|| RenderError::TemplateNotFound(template.to_string()))?;
        Ok(Box::new(FakeForm {
            fields: fields.iter().map(|field| (field.clone(), String::new())).collect(),
            flattened: false,
        }))
    }

    async fn store(&self, destination: &str, bytes: Vec<u8>) -> Result<(), RenderError> {
        self.stored.lock().unwrap().push((destination.to_string(), bytes));
        Ok(())
    }
}

pub struct FakeForm {
    fields: IndexMap<String, String>,
    flattened: bool,
}

impl FormDocument for FakeForm {
    fn set_text_field(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        let slot = self
            .fields
            .get_mut(name)
            .ok_or_else(|| RenderError::FieldNotFound(name.to_string()))?;
        *slot = value.to_string();
        Ok(())
    }

    fn flatten(&mut self) -> Result<(), RenderError> {
        self.flattened = true;
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, RenderError> {
        let rendered: Vec<String> = self.fields.iter().map(|(name, value)| format!("{name}={value}")).collect();
        Ok(format!("flattened={};{}", self.flattened, rendered.join(";")).into_bytes())
    }
}

/// Reads from an in-memory store but refuses every write.
pub struct ReadOnlyRecords(pub Arc<InMemoryRecordStore>);

#[async_trait]
impl RecordStore for ReadOnlyRecords {
    async fn find_one(&self, id: &str) -> Result<Option<Variable>, StoreError> {
        self.0.find_one(id).await
    }

    async fn update_one(&self, _id: &str, _record: &Variable) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "records.json".into(),
            source: std::io::Error::other("read-only file system"),
        })
    }

    async fn list(&self, object: Option<&str>) -> Result<Vec<Variable>, StoreError> {
        self.0.list(object).await
    }
}

/// Fakes wired into one set of collaborators, kept reachable for assertions.
pub struct Harness {
    pub records: Arc<InMemoryRecordStore>,
    pub evaluator: Arc<dyn ConditionEvaluator>,
    pub mailer: Arc<RecordingMailer>,
    pub http: Arc<StubHttpClient>,
    pub renderer: Arc<FakeRenderer>,
}

impl Harness {
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            records: Arc::new(InMemoryRecordStore::default()),
            evaluator,
            mailer: Arc::new(RecordingMailer::default()),
            http: Arc::new(StubHttpClient::replying(200, Value::Null)),
            renderer: Arc::new(FakeRenderer::default()),
        }
    }

    pub fn scripted(answers: impl IntoIterator<Item = Evaluation>) -> Self {
        Self::new(Arc::new(ScriptedEvaluator::answering(answers)))
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.records.clone(),
            self.evaluator.clone(),
            self.mailer.clone(),
            self.http.clone(),
            self.renderer.clone(),
        )
    }

    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new(self.collaborators())
    }
}

pub fn process(steps: Value) -> Process {
    serde_json::from_value(serde_json::json!({ "name": "test", "steps": steps })).expect("process decodes")
}

pub fn customer(id: &str, email: &str) -> Variable {
    Variable::new(id, "customer", "customers")
        .with_field("email", email)
        .with_field("first_name", "Ada")
}

pub fn literal_email_step(name: &str, to: &str) -> Value {
    serde_json::json!({
        "label": format!("Email {to}"),
        "name": name,
        "type": "send_email",
        "object": "",
        "meta": {"email": {"to": {"type": "literal", "value": to}, "subject": "Hello", "message": "Hi"}}
    })
}
