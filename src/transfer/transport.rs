use std::io::{self, Cursor, Read};
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::header::HeaderName;
use reqwest::blocking::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use super::archive::ArchiveArtifact;
use crate::UploadError;
use crate::config::{Config, FormFields};
use crate::util::retry_operation;

/// `(loaded, total)` byte counts of the request body. Best-effort: called from
/// the HTTP client's own thread while the body is streamed.
pub type TransferProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

pub struct UploadRequest {
    pub artifact: ArchiveArtifact,
    pub group_name: String,
    pub csrf_token: String,
    /// JSON-encoded directory map, sent when present.
    pub metadata: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(redirect_url: Option<String>) -> Self {
        Self { success: true, error_message: None, redirect_url }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()), redirect_url: None }
    }
}

/// Sends one artifact and reports how it went. Implementations never fail:
/// every problem, including a dead network, comes back as a failed outcome.
pub trait UploadTransport {
    fn upload(&self, request: UploadRequest, progress: &TransferProgress) -> UploadOutcome;
}

const GENERIC_FAILURE: &str = "Upload failed";

/// Map a server answer onto an outcome. Total and deterministic; rules apply
/// in this order:
/// 1. 200 with an empty body succeeds.
/// 2. 200 with a body that is not JSON succeeds.
/// 3. 200 with JSON lacking `success`, or with a truthy `success`, succeeds.
/// 4. JSON with a falsy `success` fails with its `error` text; without one,
///    a non-200 names the status code and a 200 uses the generic message.
/// 5. Anything else fails, naming the status code.
pub fn interpret_response(status: u16, body: &str) -> UploadOutcome {
    let trimmed = body.trim();
    if status == 200 && trimmed.is_empty() {
        return UploadOutcome::succeeded(None);
    }
    let parsed = if trimmed.is_empty() { None } else { serde_json::from_str::<Value>(trimmed).ok() };
    match parsed {
        None if status == 200 => {
            tracing::debug!("non-JSON 200 response treated as success");
            UploadOutcome::succeeded(None)
        }
        None => UploadOutcome::failed(status_message(status)),
        Some(v) => {
            if let Some(flag) = v.get("success")
                && is_falsy(flag)
            {
                let msg = match error_text(&v) {
                    Some(text) => text,
                    None if status != 200 => status_message(status),
                    None => GENERIC_FAILURE.to_string(),
                };
                return UploadOutcome::failed(msg);
            }
            if status == 200 {
                let redirect = v.get("redirect_url").and_then(Value::as_str).map(str::to_string);
                UploadOutcome::succeeded(redirect)
            } else {
                UploadOutcome::failed(status_message(status))
            }
        }
    }
}

fn status_message(status: u16) -> String {
    format!("{} with HTTP status {}", GENERIC_FAILURE, status)
}

// JS truthiness: false, null, 0 and "" are falsy; arrays and objects are not
fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// Server-supplied `error`, if it says anything.
fn error_text(v: &Value) -> Option<String> {
    match v.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

/// Wraps the archive bytes and reports how much the client has pulled.
pub struct ProgressReader<R> {
    inner: R,
    loaded: u64,
    total: u64,
    on_progress: TransferProgress,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, total: u64, on_progress: TransferProgress) -> Self {
        Self { inner, loaded: 0, total, on_progress }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.loaded += n as u64;
            (self.on_progress)(self.loaded, self.total);
        }
        Ok(n)
    }
}

/// Multipart `POST` against the form action with the anti-forgery header.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    csrf_header: HeaderName,
    cookie: Option<String>,
    fields: FormFields,
    max_retries: usize,
}

impl HttpTransport {
    pub fn from_config(
        config: &Config,
        endpoint: String,
        cookie: Option<String>,
    ) -> Result<Self, UploadError> {
        let csrf_header = csrf_header_name(config)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::ClientBuildFailed(e.to_string()))?;
        Ok(Self::assemble(client, config, endpoint, cookie, csrf_header))
    }

    pub fn with_client(
        client: Client,
        config: &Config,
        endpoint: String,
        cookie: Option<String>,
    ) -> Result<Self, UploadError> {
        let csrf_header = csrf_header_name(config)?;
        Ok(Self::assemble(client, config, endpoint, cookie, csrf_header))
    }

    fn assemble(
        client: Client,
        config: &Config,
        endpoint: String,
        cookie: Option<String>,
        csrf_header: HeaderName,
    ) -> Self {
        Self {
            client,
            endpoint,
            csrf_header,
            cookie,
            fields: config.fields.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // One attempt. Err only when no HTTP response was obtained.
    fn send_once(
        &self,
        request: &UploadRequest,
        progress: &TransferProgress,
    ) -> anyhow::Result<(u16, String)> {
        let total = request.artifact.len();
        // Bytes clones share the buffer
        let reader =
            ProgressReader::new(Cursor::new(request.artifact.bytes.clone()), total, progress.clone());
        let part = Part::reader_with_length(reader, total)
            .file_name(request.artifact.file_name.clone())
            .mime_str(request.artifact.content_type)
            .map_err(|e| UploadError::OperationFailed(e.to_string()))?;
        let mut form = Form::new()
            .part(self.fields.archive.clone(), part)
            .text(self.fields.group.clone(), request.group_name.clone());
        if let Some(meta) = &request.metadata {
            form = form.text(self.fields.metadata.clone(), meta.clone());
        }

        let mut req = self
            .client
            .post(&self.endpoint)
            .header(self.csrf_header.clone(), request.csrf_token.as_str())
            .multipart(form);
        if let Some(cookie) = &self.cookie {
            req = req.header(reqwest::header::COOKIE, cookie.as_str());
        }
        let resp = req.send().map_err(|e| UploadError::NetworkFault(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| UploadError::NetworkFault(e.to_string()))?;
        Ok((status, body))
    }
}

// A bad header name is a configuration problem, not something to retry.
fn csrf_header_name(config: &Config) -> Result<HeaderName, UploadError> {
    HeaderName::from_bytes(config.csrf_header_name.trim().as_bytes()).map_err(|e| {
        UploadError::ClientBuildFailed(format!(
            "invalid csrf_header_name '{}': {}",
            config.csrf_header_name, e
        ))
    })
}

impl UploadTransport for HttpTransport {
    fn upload(&self, request: UploadRequest, progress: &TransferProgress) -> UploadOutcome {
        tracing::debug!(
            "[upload] POST {} group={} size={}",
            self.endpoint,
            request.group_name,
            request.artifact.len()
        );
        match retry_operation(self.max_retries, || self.send_once(&request, progress)) {
            Ok((status, body)) => {
                let outcome = interpret_response(status, &body);
                tracing::info!(
                    "[upload] group={} status={} success={}",
                    request.group_name,
                    status,
                    outcome.success
                );
                outcome
            }
            Err(e) => {
                tracing::warn!("[upload] group={} network error: {:#}", request.group_name, e);
                UploadOutcome::failed(format!("Network error: {}", e))
            }
        }
    }
}
