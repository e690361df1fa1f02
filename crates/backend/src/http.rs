//! reqwest implementation of the dialog backend capability interface.
//!
//! Every call authenticates with HTTP basic auth and carries the protocol
//! `version` date as a query parameter.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::backend::{BackendConnector, Credentials, DialogBackend};
use parley_core::config::BackendConfig;
use parley_core::domain::intent::IntentRecord;
use parley_core::domain::message::{MessageExchange, MessageRequest};
use parley_core::domain::workspace::WorkspaceRecord;
use parley_core::errors::BackendError;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub base_url: String,
    pub api_version: String,
    pub version_date: String,
}

impl BackendEndpoint {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            version_date: config.version_date.clone(),
        }
    }

    /// `{base_url}/{api_version}/{segments...}?version={version_date}` with
    /// each segment percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.base_url).map_err(|error| {
            BackendError::transport(format!("invalid backend url `{}`: {error}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::transport(format!("backend url `{}` cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push(&self.api_version)
            .extend(segments);
        url.query_pairs_mut().append_pair("version", &self.version_date);
        Ok(url)
    }
}

/// Builds [`HttpDialogBackend`] handles sharing one connection pool.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    client: Client,
    endpoint: Arc<BackendEndpoint>,
}

impl HttpConnector {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: BackendEndpoint) -> Self {
        Self { client, endpoint: Arc::new(endpoint) }
    }

    pub fn handle(&self, credentials: &Credentials) -> HttpDialogBackend {
        HttpDialogBackend {
            client: self.client.clone(),
            endpoint: Arc::clone(&self.endpoint),
            credentials: credentials.clone(),
        }
    }
}

impl BackendConnector for HttpConnector {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn DialogBackend> {
        Arc::new(self.handle(credentials))
    }
}

#[derive(Clone, Debug)]
pub struct HttpDialogBackend {
    client: Client,
    endpoint: Arc<BackendEndpoint>,
    credentials: Credentials,
}

impl HttpDialogBackend {
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.identity, Some(self.credentials.secret()))
    }

    async fn get(&self, url: Url) -> Result<Value, BackendError> {
        self.send(self.request(Method::GET, url)).await
    }

    async fn post<T>(&self, url: Url, body: &T) -> Result<Value, BackendError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send(self.request(Method::POST, url).json(body)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|error| BackendError::transport(format!("backend request failed: {error}")))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            BackendError::transport(format!("failed to read backend response: {error}"))
        })?;

        debug!(
            event_name = "backend.http.response",
            status = status.as_u16(),
            body_bytes = bytes.len(),
            "backend responded"
        );

        if !status.is_success() {
            let body = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
                json!({ "error": String::from_utf8_lossy(&bytes), "code": status.as_u16() })
            });
            return Err(BackendError::http(status.as_u16(), body));
        }

        if bytes.is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_slice(&bytes).map_err(|error| {
            BackendError::transport(format!("failed to decode backend response: {error}"))
        })
    }
}

#[async_trait]
impl DialogBackend for HttpDialogBackend {
    async fn list_intents(&self, workspace_id: &str) -> Result<Value, BackendError> {
        self.get(self.endpoint.url(&["workspaces", workspace_id, "intents"])?).await
    }

    async fn create_intent(
        &self,
        workspace_id: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError> {
        self.post(self.endpoint.url(&["workspaces", workspace_id, "intents"])?, intent).await
    }

    async fn update_intent(
        &self,
        workspace_id: &str,
        intent_key: &str,
        intent: &IntentRecord,
    ) -> Result<Value, BackendError> {
        let url = self.endpoint.url(&["workspaces", workspace_id, "intents", intent_key])?;
        self.post(url, intent).await
    }

    async fn list_workspaces(&self) -> Result<Value, BackendError> {
        self.get(self.endpoint.url(&["workspaces"])?).await
    }

    async fn create_workspace(&self, workspace: &WorkspaceRecord) -> Result<Value, BackendError> {
        self.post(self.endpoint.url(&["workspaces"])?, workspace).await
    }

    async fn get_workspace(
        &self,
        workspace_id: &str,
        export: bool,
    ) -> Result<Value, BackendError> {
        let mut url = self.endpoint.url(&["workspaces", workspace_id])?;
        if export {
            url.query_pairs_mut().append_pair("export", "true");
        }
        self.get(url).await
    }

    async fn message(
        &self,
        workspace_id: &str,
        request: &MessageRequest,
    ) -> Result<MessageExchange, BackendError> {
        let url = self.endpoint.url(&["workspaces", workspace_id, "message"])?;
        let body = self.post(url, request).await?;
        serde_json::from_value(body).map_err(|error| {
            BackendError::transport(format!("backend message response is malformed: {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use parley_core::backend::{BackendConnector, Credentials, DialogBackend};
    use parley_core::domain::intent::IntentRecord;
    use parley_core::domain::message::MessageRequest;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{BackendEndpoint, HttpConnector};

    // base64("svc-user:svc-pass")
    const BASIC_AUTH: &str = "Basic c3ZjLXVzZXI6c3ZjLXBhc3M=";

    fn connector(server: &MockServer) -> HttpConnector {
        HttpConnector::new(BackendEndpoint {
            base_url: format!("{}/conversation/api", server.uri()),
            api_version: "v1".to_string(),
            version_date: "2017-02-03".to_string(),
        })
    }

    fn credentials() -> Credentials {
        Credentials::new("svc-user", "svc-pass")
    }

    #[test]
    fn url_encodes_segments_and_appends_version() {
        let endpoint = BackendEndpoint {
            base_url: "https://dialog.example.com/api/".to_string(),
            api_version: "v1".to_string(),
            version_date: "2017-02-03".to_string(),
        };

        let url = endpoint.url(&["workspaces", "ws 1", "intents", "a/b"]).expect("url");

        assert_eq!(
            url.as_str(),
            "https://dialog.example.com/api/v1/workspaces/ws%201/intents/a%2Fb?version=2017-02-03"
        );
    }

    #[test]
    fn invalid_base_url_is_a_transport_error() {
        let endpoint = BackendEndpoint {
            base_url: "not a url".to_string(),
            api_version: "v1".to_string(),
            version_date: "2017-02-03".to_string(),
        };

        let error = endpoint.url(&["workspaces"]).expect_err("should fail");
        assert_eq!(error.status, None);
    }

    #[tokio::test]
    async fn list_intents_authenticates_and_returns_body() {
        let server = MockServer::start().await;
        let body = json!({ "intents": [{ "intent": "greeting" }], "pagination": {} });
        Mock::given(method("GET"))
            .and(path("/conversation/api/v1/workspaces/ws-1/intents"))
            .and(query_param("version", "2017-02-03"))
            .and(header("authorization", BASIC_AUTH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        let result = backend.list_intents("ws-1").await.expect("list intents");

        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn update_intent_posts_to_old_name() {
        let server = MockServer::start().await;
        let record = IntentRecord::replacement(
            "greeting",
            &["hi".to_string()],
            "2017-02-03T10:15:00+00:00",
        );
        Mock::given(method("POST"))
            .and(path("/conversation/api/v1/workspaces/ws-1/intents/hello"))
            .and(body_json(json!({
                "intent": "greeting",
                "description": null,
                "updated": "2017-02-03T10:15:00+00:00",
                "examples": [{
                    "text": "hi",
                    "created": "2017-02-03T10:15:00+00:00",
                    "updated": "2017-02-03T10:15:00+00:00"
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "intent": "greeting" })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        backend.update_intent("ws-1", "hello", &record).await.expect("update intent");
    }

    #[tokio::test]
    async fn get_workspace_requests_export() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversation/api/v1/workspaces/ws-9"))
            .and(query_param("export", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "workspace_id": "ws-9" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        let document = backend.get_workspace("ws-9", true).await.expect("get workspace");

        assert_eq!(document["workspace_id"], "ws-9");
    }

    #[tokio::test]
    async fn error_status_carries_backend_body() {
        let server = MockServer::start().await;
        let error_body = json!({ "error": "Invalid request", "code": 400 });
        Mock::given(method("POST"))
            .and(path("/conversation/api/v1/workspaces/ws-1/message"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body.clone()))
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        let error =
            backend.message("ws-1", &MessageRequest::default()).await.expect_err("should fail");

        assert_eq!(error.status, Some(400));
        assert_eq!(error.body, error_body);
        assert_eq!(error.message, "Invalid request");
    }

    #[tokio::test]
    async fn non_json_error_body_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversation/api/v1/workspaces"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        let error = backend.list_workspaces().await.expect_err("should fail");

        assert_eq!(error.status, Some(503));
        assert_eq!(error.body, json!({ "error": "upstream unavailable", "code": 503 }));
    }

    #[tokio::test]
    async fn message_sends_input_and_context_and_decodes_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversation/api/v1/workspaces/ws-1/message"))
            .and(body_json(json!({ "input": { "text": "hi" }, "context": {} })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "input": { "text": "hi" },
                "context": { "conversation_id": "c-1" },
                "intents": [{ "intent": "greeting", "confidence": 0.91 }],
                "entities": [],
                "output": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = connector(&server).connect(&credentials());
        let request: MessageRequest =
            serde_json::from_value(json!({ "input": { "text": "hi" } })).expect("request");
        let exchange = backend.message("ws-1", &request).await.expect("message");

        assert_eq!(exchange.conversation_id(), Some("c-1"));
        assert_eq!(exchange.top_intent().map(|intent| intent.confidence), Some(0.91));
        assert!(!exchange.has_output());
    }

    #[tokio::test]
    async fn unreachable_backend_has_no_status() {
        let connector = HttpConnector::new(BackendEndpoint {
            base_url: "http://127.0.0.1:9".to_string(),
            api_version: "v1".to_string(),
            version_date: "2017-02-03".to_string(),
        });

        let error = connector.connect(&credentials()).list_workspaces().await.expect_err("fails");

        assert_eq!(error.status, None);
    }
}
