use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Failure reported by the dialog backend. `status` is absent when the call
/// never produced an HTTP response (connection refused, TLS, decode, ...).
#[derive(Clone, Debug, Error, PartialEq)]
#[error("backend call failed: {message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
    pub body: Value,
}

impl BackendError {
    pub fn http(status: u16, body: Value) -> Self {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("backend responded with status {status}"));
        Self { status: Some(status), message, body }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        Self { status: None, body: json!({ "error": message }), message }
    }
}

/// Operations whose failures collapse into the uniform `{status, message}`
/// envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardOperation {
    ListIntents,
    CreateIntent,
    UpdateIntent,
    ListWorkspaces,
    CreateWorkspace,
    GetWorkspace,
}

impl ForwardOperation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::ListIntents => "Error fetching intents",
            Self::CreateIntent => "Error posting intent",
            Self::UpdateIntent => "Error updating intent",
            Self::ListWorkspaces => "Error getting workspaces",
            Self::CreateWorkspace => "Error creating workspace",
            Self::GetWorkspace => "Error getting workspace",
        }
    }

    pub fn event_name(self) -> &'static str {
        match self {
            Self::ListIntents => "forward.intents.list",
            Self::CreateIntent => "forward.intents.create",
            Self::UpdateIntent => "forward.intents.update",
            Self::ListWorkspaces => "forward.workspaces.list",
            Self::CreateWorkspace => "forward.workspaces.create",
            Self::GetWorkspace => "forward.workspaces.get",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ForwardError {
    /// Uniform envelope; the underlying backend error has already been logged.
    #[error("{message}")]
    Envelope { status: u16, message: &'static str },
    /// Message-exchange failure, surfaced with the backend's own code and body.
    #[error("backend rejected message exchange with status {status}")]
    Backend { status: u16, body: Value },
}

impl ForwardError {
    pub fn envelope(operation: ForwardOperation) -> Self {
        Self::Envelope { status: DEFAULT_ERROR_STATUS, message: operation.failure_message() }
    }

    pub fn passthrough(error: BackendError) -> Self {
        Self::Backend { status: error.status.unwrap_or(DEFAULT_ERROR_STATUS), body: error.body }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Envelope { status, .. } | Self::Backend { status, .. } => *status,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Envelope { status, message } => json!({ "status": status, "message": message }),
            Self::Backend { body, .. } => body.clone(),
        }
    }
}
