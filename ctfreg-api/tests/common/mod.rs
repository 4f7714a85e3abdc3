/// Common test utilities for integration tests
///
/// - In-memory store and mail outbox
/// - Temporary media root
/// - Multipart request builder
/// - Response helpers

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use ctfreg_api::{
    app::{build_router, AppState},
    config::Config,
};
use ctfreg_shared::{
    mail::{MailError, Mailer, MemoryMailer, OutgoingMail},
    store::MemoryStore,
};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

pub const COMPETITION_NAME: &str = "FAUST CTF";
pub const BOUNDARY: &str = "ctfreg-test-boundary";

/// 1x1 transparent PNG
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Mail transport whose relay never answers
pub struct UnreachableRelay;

#[async_trait]
impl Mailer for UnreachableRelay {
    async fn send_mail(&self, _mail: OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub media_root: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Creates a context with extra configuration variables
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mailer = Arc::new(MemoryMailer::new());
        Self::build(overrides, mailer.clone(), mailer)
    }

    /// Creates a context whose confirmation mails cannot be delivered
    pub fn with_unreachable_relay() -> Self {
        Self::build(&[], Arc::new(UnreachableRelay), Arc::new(MemoryMailer::new()))
    }

    fn build(
        overrides: &[(&str, &str)],
        transport: Arc<dyn Mailer>,
        mailer: Arc<MemoryMailer>,
    ) -> Self {
        let media_root = tempfile::tempdir().unwrap();
        let media_path = media_root.path().to_string_lossy().to_string();

        let mut vars: HashMap<String, String> = [
            ("STORE_BACKEND", "memory"),
            ("SECRET_KEY", "integration-test-secret-key-0123456789"),
            ("COMPETITION_NAME", COMPETITION_NAME),
            ("DEFAULT_FROM_EMAIL", "noreply@ctf.example.org"),
            ("ALLOWED_HOSTS", "ctf.example.org"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.insert("MEDIA_ROOT".to_string(), media_path);
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), transport, config);

        TestContext {
            app: build_router(state),
            store,
            mailer,
            media_root,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub fn outbox(&self) -> Vec<OutgoingMail> {
        self.mailer.outbox()
    }
}

/// Builder for `multipart/form-data` registration bodies
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, host: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/v1/register")
            .header(header::HOST, host)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A complete, valid registration for `username`
pub fn registration(username: &str) -> MultipartBody {
    MultipartBody::new()
        .text("username", username)
        .text("password", "correct horse battery staple")
        .text("email", &format!("{username}@example.org"))
        .text("informal_email", &format!("{username}-team@example.org"))
        .text("country", "Germany")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "ctf.example.org")
        .body(Body::empty())
        .unwrap()
}

/// Reads the status and JSON body of a response
pub async fn json(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

/// Extracts the confirmation link path (`/confirm-email?...`) from a mail
pub fn confirmation_path(mail: &OutgoingMail) -> String {
    let start = mail
        .body
        .find("/confirm-email?")
        .expect("mail contains a confirmation link");
    mail.body[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}
