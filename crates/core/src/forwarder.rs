//! Translates gateway operations into backend calls against the active
//! runtime configuration and maps their outcomes.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::augment::DisambiguationPolicy;
use crate::backend::Credentials;
use crate::domain::intent::{
    format_timestamp, CreateIntentRequest, IntentRecord, UpdateIntentRequest,
};
use crate::domain::message::{MessageExchange, MessageRequest};
use crate::domain::workspace::WorkspaceRecord;
use crate::errors::{BackendError, ForwardError, ForwardOperation};
use crate::runtime::RuntimeConfigStore;

/// Minimal acknowledgement returned by create/update and configuration calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub status: String,
}

impl Acknowledgement {
    pub fn ok() -> Self {
        Self { status: "OK".to_string() }
    }
}

/// Body of a reconfiguration request. Credentials only count when both halves
/// are present; blank values are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfigureRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "workspaceId")]
    pub workspace_id: Option<String>,
}

impl ReconfigureRequest {
    pub fn credentials(&self) -> Option<Credentials> {
        match (non_blank(&self.username), non_blank(&self.password)) {
            (Some(identity), Some(secret)) => Some(Credentials::new(identity, secret)),
            _ => None,
        }
    }

    pub fn workspace(&self) -> Option<String> {
        non_blank(&self.workspace_id).map(ToString::to_string)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

#[derive(Clone, Debug)]
pub struct RequestForwarder {
    store: RuntimeConfigStore,
    policy: DisambiguationPolicy,
}

impl RequestForwarder {
    pub fn new(store: RuntimeConfigStore) -> Self {
        Self::with_policy(store, DisambiguationPolicy::default())
    }

    pub fn with_policy(store: RuntimeConfigStore, policy: DisambiguationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &RuntimeConfigStore {
        &self.store
    }

    pub async fn list_intents(&self) -> Result<Value, ForwardError> {
        let snapshot = self.store.snapshot();
        let result = snapshot.backend.list_intents(snapshot.workspace_id()).await;
        envelope(ForwardOperation::ListIntents, snapshot.workspace_id(), result)
    }

    pub async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<Acknowledgement, ForwardError> {
        let snapshot = self.store.snapshot();
        let stamp = format_timestamp(Local::now());
        let utterances = request.utterances.unwrap_or_default();
        let record = IntentRecord::new_intent(&request.name, &utterances, &stamp);

        debug!(
            event_name = "forward.intents.create.payload",
            workspace_id = %snapshot.workspace_id(),
            intent = %record.intent,
            example_count = record.examples.len(),
            stamp = %stamp,
            "sending intent"
        );
        let result = snapshot.backend.create_intent(snapshot.workspace_id(), &record).await;
        envelope(ForwardOperation::CreateIntent, snapshot.workspace_id(), result)
            .map(|_| Acknowledgement::ok())
    }

    /// `path_key` is the intent id from the request path. It is only logged:
    /// the backend is addressed by `old_name`, falling back to `name`.
    pub async fn update_intent(
        &self,
        path_key: &str,
        request: UpdateIntentRequest,
    ) -> Result<Acknowledgement, ForwardError> {
        let snapshot = self.store.snapshot();
        let stamp = format_timestamp(Local::now());
        let intent_key = request.lookup_name().to_string();
        let utterances = request.utterances.unwrap_or_default();
        let record = IntentRecord::replacement(&request.name, &utterances, &stamp);

        if path_key != intent_key {
            warn!(
                event_name = "forward.intents.update.path_mismatch",
                path_key = %path_key,
                intent_key = %intent_key,
                "request path intent differs from the intent being updated"
            );
        }
        debug!(
            event_name = "forward.intents.update.payload",
            workspace_id = %snapshot.workspace_id(),
            intent_key = %intent_key,
            intent = %record.intent,
            example_count = record.examples.len(),
            stamp = %stamp,
            "sending intent update"
        );
        let result =
            snapshot.backend.update_intent(snapshot.workspace_id(), &intent_key, &record).await;
        envelope(ForwardOperation::UpdateIntent, snapshot.workspace_id(), result)
            .map(|_| Acknowledgement::ok())
    }

    pub async fn list_workspaces(&self) -> Result<Value, ForwardError> {
        let snapshot = self.store.snapshot();
        let result = snapshot.backend.list_workspaces().await;
        envelope(ForwardOperation::ListWorkspaces, snapshot.workspace_id(), result)
    }

    pub async fn create_workspace(
        &self,
        workspace: WorkspaceRecord,
    ) -> Result<Value, ForwardError> {
        let snapshot = self.store.snapshot();
        info!(
            event_name = "forward.workspaces.create.start",
            workspace_name = %workspace.display_name(),
            "creating workspace"
        );
        let result = snapshot.backend.create_workspace(&workspace).await;
        envelope(ForwardOperation::CreateWorkspace, snapshot.workspace_id(), result)
    }

    pub async fn get_workspace(&self, workspace_id: &str) -> Result<Value, ForwardError> {
        let snapshot = self.store.snapshot();
        let result = snapshot.backend.get_workspace(workspace_id, true).await;
        envelope(ForwardOperation::GetWorkspace, workspace_id, result)
    }

    pub fn select_workspace(&self, workspace_id: &str) -> Acknowledgement {
        self.store.select_workspace(workspace_id);
        Acknowledgement::ok()
    }

    pub fn reconfigure(&self, request: &ReconfigureRequest) -> Acknowledgement {
        self.store.set(request.credentials(), request.workspace());
        Acknowledgement::ok()
    }

    /// Sends one conversational turn. Backend failures keep their own status
    /// and body; successful responses go through the disambiguation policy.
    pub async fn send_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageExchange, ForwardError> {
        let snapshot = self.store.snapshot();
        match snapshot.backend.message(snapshot.workspace_id(), &request).await {
            Ok(mut exchange) => {
                self.policy.augment(&mut exchange);
                Ok(exchange)
            }
            Err(backend_error) => {
                error!(
                    event_name = "forward.message.failed",
                    workspace_id = %snapshot.workspace_id(),
                    status = ?backend_error.status,
                    error = %backend_error,
                    "message exchange failed"
                );
                Err(ForwardError::passthrough(backend_error))
            }
        }
    }
}

fn envelope(
    operation: ForwardOperation,
    workspace_id: &str,
    result: Result<Value, BackendError>,
) -> Result<Value, ForwardError> {
    result.map_err(|backend_error| {
        error!(
            event_name = operation.event_name(),
            workspace_id = %workspace_id,
            status = ?backend_error.status,
            error = %backend_error,
            body = %backend_error.body,
            "{}",
            operation.failure_message()
        );
        ForwardError::envelope(operation)
    })
}
