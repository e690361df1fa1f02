//! Capability interface of the remote dialog service.
//!
//! The gateway never interprets backend documents beyond what the message
//! augmenter needs, so most operations exchange raw JSON.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::intent::IntentRecord;
use crate::domain::message::{MessageExchange, MessageRequest};
use crate::domain::workspace::WorkspaceRecord;
use crate::errors::BackendError;

/// Identity/secret pair used to authenticate against the backend. The pair is
/// always replaced as a unit.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub identity: String,
    pub secret: SecretString,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { identity: identity.into(), secret: SecretString::from(secret.into()) }
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

#[async_trait]
pub trait DialogBackend: Send + Sync {
    async fn list_intents(&self, workspace_id: &str) -> Result<Value, BackendError>;

    async fn create_intent(
        &self,
        workspace_id: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError>;

    /// `intent_key` addresses the existing intent; `intent.intent` carries the
    /// (possibly new) name.
    async fn update_intent(
        &self,
        workspace_id: &str,
        intent_key: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError>;

    async fn list_workspaces(&self) -> Result<Value, BackendError>;

    async fn create_workspace(&self, workspace: &WorkspaceRecord) -> Result<Value, BackendError>;

    async fn get_workspace(&self, workspace_id: &str, export: bool)
        -> Result<Value, BackendError>;

    async fn message(
        &self,
        workspace_id: &str,
        request: &MessageRequest,
    ) -> Result<MessageExchange, BackendError>;
}

/// Builds authenticated backend handles. Called once at startup and again on
/// every reconfiguration.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn DialogBackend>;
}
