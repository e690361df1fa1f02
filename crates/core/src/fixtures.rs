//! Scripted in-memory backend used by forwarder, router and CLI tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{BackendConnector, Credentials, DialogBackend};
use crate::domain::intent::IntentRecord;
use crate::domain::message::{MessageExchange, MessageRequest};
use crate::domain::workspace::WorkspaceRecord;
use crate::errors::BackendError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOperation {
    ListIntents,
    CreateIntent,
    UpdateIntent,
    ListWorkspaces,
    CreateWorkspace,
    GetWorkspace,
    Message,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    ListIntents { workspace_id: String },
    CreateIntent { workspace_id: String, intent: IntentRecord },
    UpdateIntent { workspace_id: String, intent_key: String, intent: IntentRecord },
    ListWorkspaces,
    CreateWorkspace { workspace: WorkspaceRecord },
    GetWorkspace { workspace_id: String, export: bool },
    Message { workspace_id: String, request: MessageRequest },
}

/// A call as observed by the backend, tagged with the identity of the handle
/// that issued it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub identity: String,
    pub call: BackendCall,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: HashMap<BackendOperation, Result<Value, BackendError>>,
    calls: Vec<RecordedCall>,
    connections: Vec<String>,
}

/// Connector handing out [`ScriptedBackend`] handles that share one script and
/// one call log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnector {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, operation: BackendOperation, response: Result<Value, BackendError>) {
        self.lock().responses.insert(operation, response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.lock().calls.last().cloned()
    }

    /// Identities of every handle built so far, in order.
    pub fn connections(&self) -> Vec<String> {
        self.lock().connections.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BackendConnector for ScriptedConnector {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn DialogBackend> {
        self.lock().connections.push(credentials.identity.clone());
        Arc::new(ScriptedBackend { identity: credentials.identity.clone(), script: self.clone() })
    }
}

#[derive(Clone, Debug)]
pub struct ScriptedBackend {
    identity: String,
    script: ScriptedConnector,
}

impl ScriptedBackend {
    fn record(
        &self,
        operation: BackendOperation,
        call: BackendCall,
    ) -> Result<Value, BackendError> {
        let mut state = self.script.lock();
        state.calls.push(RecordedCall { identity: self.identity.clone(), call });
        state.responses.get(&operation).cloned().unwrap_or_else(|| Ok(default_response(operation)))
    }
}

fn default_response(operation: BackendOperation) -> Value {
    match operation {
        BackendOperation::ListIntents => json!({ "intents": [], "pagination": {} }),
        BackendOperation::ListWorkspaces => json!({ "workspaces": [], "pagination": {} }),
        BackendOperation::Message => json!({ "intents": [], "entities": [], "output": {} }),
        _ => json!({}),
    }
}

#[async_trait]
impl DialogBackend for ScriptedBackend {
    async fn list_intents(&self, workspace_id: &str) -> Result<Value, BackendError> {
        self.record(
            BackendOperation::ListIntents,
            BackendCall::ListIntents { workspace_id: workspace_id.to_string() },
        )
    }

    async fn create_intent(
        &self,
        workspace_id: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError> {
        self.record(
            BackendOperation::CreateIntent,
            BackendCall::CreateIntent {
                workspace_id: workspace_id.to_string(),
                intent: intent.clone(),
            },
        )
    }

    async fn update_intent(
        &self,
        workspace_id: &str,
        intent_key: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError> {
        self.record(
            BackendOperation::UpdateIntent,
            BackendCall::UpdateIntent {
                workspace_id: workspace_id.to_string(),
                intent_key: intent_key.to_string(),
                intent: intent.clone(),
            },
        )
    }

    async fn list_workspaces(&self) -> Result<Value, BackendError> {
        self.record(BackendOperation::ListWorkspaces, BackendCall::ListWorkspaces)
    }

    async fn create_workspace(&self, workspace: &WorkspaceRecord) -> Result<Value, BackendError> {
        self.record(
            BackendOperation::CreateWorkspace,
            BackendCall::CreateWorkspace { workspace: workspace.clone() },
        )
    }

    async fn get_workspace(
        &self,
        workspace_id: &str,
        export: bool,
    ) -> Result<Value, BackendError> {
        self.record(
            BackendOperation::GetWorkspace,
            BackendCall::GetWorkspace { workspace_id: workspace_id.to_string(), export },
        )
    }

    async fn message(
        &self,
        workspace_id: &str,
        request: &MessageRequest,
    ) -> Result<MessageExchange, BackendError> {
        let response = self.record(
            BackendOperation::Message,
            BackendCall::Message {
                workspace_id: workspace_id.to_string(),
                request: request.clone(),
            },
        )?;
        serde_json::from_value(response).map_err(|error| {
            BackendError::transport(format!("scripted message response is malformed: {error}"))
        })
    }
}
