//! HTTP surface of the gateway.
//!
//! - `GET  /`                          : liveness banner (text)
//! - `GET  /api-docs.json`             : route description
//! - `GET  /intents`                   : list intents of the active workspace
//! - `POST /intents`                   : create an intent with example utterances
//! - `POST /intents/{intent_id}`       : update / rename an intent
//! - `GET  /workspaces`                : list workspaces
//! - `POST /workspaces`                : create a workspace
//! - `GET  /workspaces/{workspace_id}` : export one workspace
//! - `POST /workspace/{workspace_id}`  : select the active workspace
//! - `POST /config`                    : replace active credentials / workspace
//! - `POST /api/message`               : one conversational turn

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Form, FromRequest, Path, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE, ORIGIN},
        HeaderName, Request, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parley_core::{
    Acknowledgement, CreateIntentRequest, ForwardError, MessageExchange, MessageRequest,
    ReconfigureRequest, RequestForwarder, UpdateIntentRequest, WorkspaceRecord,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::api_docs;

#[derive(Clone)]
pub struct GatewayState {
    forwarder: RequestForwarder,
}

/// Forwarder failure rendered as an HTTP response: the uniform envelope for
/// CRUD operations, the backend's own status and body for message exchange.
#[derive(Debug)]
pub struct ApiError(ForwardError);

impl From<ForwardError> for ApiError {
    fn from(error: ForwardError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .ok()
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body())).into_response()
    }
}

/// Body that may be JSON, urlencoded, or missing entirely. A request without
/// a content type decodes to `T::default()`.
pub struct OptionalBody<T>(pub T);

impl<T, S> FromRequest<S> for OptionalBody<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(body) = Form::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(body));
        }

        let body = Option::<Json<T>>::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(body.map(|Json(body)| body).unwrap_or_default()))
    }
}

pub fn banner_text() -> String {
    format!("Parley dialog gateway v{}", env!("CARGO_PKG_VERSION"))
}

pub fn router(forwarder: RequestForwarder, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/api-docs.json", get(api_docs_document))
        .route("/intents", get(list_intents).post(create_intent))
        .route("/intents/{intent_id}", post(update_intent))
        .route("/workspaces", get(list_workspaces).post(create_workspace))
        .route("/workspaces/{workspace_id}", get(get_workspace))
        .route("/workspace/{workspace_id}", post(select_workspace))
        .route("/config", post(reconfigure))
        .route("/api/message", post(send_message))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                correlation_id = %Uuid::new_v4(),
            )
        }))
        .with_state(GatewayState { forwarder })
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_headers([
        ORIGIN,
        HeaderName::from_static("x-requested-with"),
        CONTENT_TYPE,
        ACCEPT,
    ])
}

async fn banner() -> String {
    banner_text()
}

async fn api_docs_document() -> Json<Value> {
    Json(api_docs::document())
}

async fn list_intents(State(state): State<GatewayState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.forwarder.list_intents().await?))
}

async fn create_intent(
    State(state): State<GatewayState>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<Acknowledgement>, ApiError> {
    info!(
        event_name = "gateway.intents.create.received",
        intent = %request.name,
        utterance_count = request.utterances.as_ref().map_or(0, Vec::len),
        "received intent"
    );
    Ok(Json(state.forwarder.create_intent(request).await?))
}

async fn update_intent(
    Path(intent_id): Path<String>,
    State(state): State<GatewayState>,
    Json(request): Json<UpdateIntentRequest>,
) -> Result<Json<Acknowledgement>, ApiError> {
    info!(
        event_name = "gateway.intents.update.received",
        intent_id = %intent_id,
        intent = %request.name,
        old_name = ?request.old_name,
        "received intent update"
    );
    Ok(Json(state.forwarder.update_intent(&intent_id, request).await?))
}

async fn list_workspaces(State(state): State<GatewayState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.forwarder.list_workspaces().await?))
}

async fn create_workspace(
    State(state): State<GatewayState>,
    Json(workspace): Json<WorkspaceRecord>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.forwarder.create_workspace(workspace).await?))
}

async fn get_workspace(
    Path(workspace_id): Path<String>,
    State(state): State<GatewayState>,
) -> Result<Json<Value>, ApiError> {
    info!(
        event_name = "gateway.workspaces.get.received",
        workspace_id = %workspace_id,
        "received request for workspace"
    );
    Ok(Json(state.forwarder.get_workspace(&workspace_id).await?))
}

async fn select_workspace(
    Path(workspace_id): Path<String>,
    State(state): State<GatewayState>,
) -> Json<Acknowledgement> {
    Json(state.forwarder.select_workspace(&workspace_id))
}

async fn reconfigure(
    State(state): State<GatewayState>,
    OptionalBody(request): OptionalBody<ReconfigureRequest>,
) -> Json<Acknowledgement> {
    Json(state.forwarder.reconfigure(&request))
}

async fn send_message(
    State(state): State<GatewayState>,
    OptionalBody(request): OptionalBody<MessageRequest>,
) -> Result<Json<MessageExchange>, ApiError> {
    Ok(Json(state.forwarder.send_message(request).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use parley_core::config::DEFAULT_BODY_LIMIT_BYTES;
    use parley_core::fixtures::{BackendCall, BackendOperation, ScriptedConnector};
    use parley_core::{
        BackendError, Credentials, MessageRequest, RequestForwarder, RuntimeConfig,
        RuntimeConfigStore,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::router;

    const BODY_LIMIT: usize = 1024 * 1024;

    fn app() -> (Router, ScriptedConnector) {
        let connector = ScriptedConnector::new();
        let defaults = RuntimeConfig {
            credentials: Credentials::new("default-user", "default-pass"),
            active_workspace_id: "ws-default".to_string(),
        };
        let store = RuntimeConfigStore::new(defaults, Arc::new(connector.clone()));
        (router(RequestForwarder::new(store), DEFAULT_BODY_LIMIT_BYTES), connector)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().method(Method::GET).uri(uri).body(Body::empty()).expect("build request")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    async fn call(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.expect("router call")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.expect("read body");
        serde_json::from_slice(&bytes).expect("parse json")
    }

    #[tokio::test]
    async fn banner_is_plain_text() {
        let (app, _) = app();

        let response = call(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.expect("read body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.starts_with("Parley dialog gateway v"));
    }

    #[tokio::test]
    async fn api_docs_lists_message_route() {
        let (app, _) = app();

        let response = call(&app, get("/api-docs.json")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let document = json_body(response).await;
        assert!(document["paths"]["/api/message"]["post"].is_object());
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let (app, _) = app();
        let request = Request::builder()
            .uri("/intents")
            .header("origin", "https://client.example.com")
            .body(Body::empty())
            .expect("build request");

        let response = call(&app, request).await;

        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok());
        assert_eq!(allow_origin, Some("*"));
    }

    #[tokio::test]
    async fn create_intent_acknowledges_with_ok() {
        let (app, connector) = app();

        let response =
            call(&app, post_json("/intents", json!({ "name": "greeting", "utterances": ["hi"] })))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "OK" }));
        assert!(matches!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::CreateIntent { ref workspace_id, .. }) if workspace_id == "ws-default"
        ));
    }

    #[tokio::test]
    async fn update_intent_renames_with_shared_timestamp() {
        let (app, connector) = app();

        let response = call(
            &app,
            post_json(
                "/intents/hello",
                json!({ "name": "greeting", "old_name": "hello", "utterances": ["hi", "hey"] }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "OK" }));

        let Some(BackendCall::UpdateIntent { intent_key, intent, .. }) =
            connector.last_call().map(|recorded| recorded.call)
        else {
            panic!("expected an update-intent call");
        };
        assert_eq!(intent_key, "hello");
        assert_eq!(intent.intent, "greeting");
        assert_eq!(intent.examples.len(), 2);
        assert_eq!(intent.examples[0].created, intent.examples[1].created);
        assert_eq!(intent.examples[0].created, intent.updated);
    }

    #[tokio::test]
    async fn message_with_confident_intent_gets_understood_text() {
        let (app, connector) = app();
        connector.respond(
            BackendOperation::Message,
            Ok(json!({
                "intents": [{ "intent": "order_pizza", "confidence": 0.82 }],
                "output": {}
            })),
        );

        let response =
            call(&app, post_json("/api/message", json!({ "input": { "text": "pizza" } }))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["output"]["text"], "I understood your intent was order_pizza");
        assert_eq!(body["intents"][0]["intent"], "order_pizza");
    }

    #[tokio::test]
    async fn message_without_intents_gets_fallback_text() {
        let (app, connector) = app();
        connector.respond(BackendOperation::Message, Ok(json!({ "intents": [], "output": {} })));

        let response = call(&app, post_json("/api/message", json!({}))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["output"]["text"], "I did not understand your intent");
    }

    #[tokio::test]
    async fn message_failure_propagates_backend_status_and_body() {
        let (app, connector) = app();
        let error_body = json!({ "error": "Invalid input", "code": 400 });
        connector
            .respond(BackendOperation::Message, Err(BackendError::http(400, error_body.clone())));

        let response = call(&app, post_json("/api/message", json!({ "input": {} }))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, error_body);
    }

    #[tokio::test]
    async fn message_transport_failure_defaults_to_500() {
        let (app, connector) = app();
        connector.respond(BackendOperation::Message, Err(BackendError::transport("refused")));

        let response = call(&app, post_json("/api/message", json!({}))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": "refused" }));
    }

    #[tokio::test]
    async fn config_then_list_intents_uses_new_workspace() {
        let (app, connector) = app();

        let response = call(&app, post_json("/config", json!({ "workspaceId": "ws-42" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "OK" }));

        let response = call(&app, get("/intents")).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::ListIntents { workspace_id: "ws-42".to_string() })
        );
    }

    #[tokio::test]
    async fn config_without_body_resets_to_defaults() {
        let (app, connector) = app();
        call(&app, post_json("/config", json!({ "workspaceId": "ws-42" }))).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/config")
            .body(Body::empty())
            .expect("build request");
        let response = call(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "OK" }));

        call(&app, get("/intents")).await;
        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::ListIntents { workspace_id: "ws-default".to_string() })
        );
    }

    #[tokio::test]
    async fn config_accepts_urlencoded_form() {
        let (app, connector) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/config")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("workspaceId=ws-42"))
            .expect("build request");

        let response = call(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        call(&app, get("/intents")).await;
        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::ListIntents { workspace_id: "ws-42".to_string() })
        );
    }

    #[tokio::test]
    async fn message_without_body_forwards_empty_turn() {
        let (app, connector) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/message")
            .body(Body::empty())
            .expect("build request");

        let response = call(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::Message {
                workspace_id: "ws-default".to_string(),
                request: MessageRequest::default(),
            })
        );
        assert_eq!(
            json_body(response).await["output"]["text"],
            "I did not understand your intent"
        );
    }

    #[tokio::test]
    async fn config_with_credentials_rebuilds_backend_handle() {
        let (app, connector) = app();

        call(&app, post_json("/config", json!({ "username": "tenant", "password": "pw" }))).await;
        call(&app, get("/workspaces")).await;

        let recorded = connector.last_call().expect("backend call");
        assert_eq!(recorded.identity, "tenant");
        assert_eq!(connector.connections(), vec!["default-user", "tenant"]);
    }

    #[tokio::test]
    async fn select_workspace_changes_active_workspace() {
        let (app, connector) = app();

        let response = call(&app, post_json("/workspace/ws-7", json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "OK" }));

        call(&app, get("/intents")).await;
        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::ListIntents { workspace_id: "ws-7".to_string() })
        );
    }

    #[tokio::test]
    async fn list_workspaces_failure_returns_uniform_envelope() {
        let (app, connector) = app();
        connector.respond(
            BackendOperation::ListWorkspaces,
            Err(BackendError::http(403, json!({ "error": "Forbidden", "code": 403 }))),
        );

        let response = call(&app, get("/workspaces")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "status": 500, "message": "Error getting workspaces" })
        );
    }

    #[tokio::test]
    async fn get_workspace_forwards_path_id_with_export() {
        let (app, connector) = app();
        connector.respond(
            BackendOperation::GetWorkspace,
            Ok(json!({ "workspace_id": "ws-9", "dialog_nodes": [] })),
        );

        let response = call(&app, get("/workspaces/ws-9")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["workspace_id"], "ws-9");
        assert_eq!(
            connector.last_call().map(|recorded| recorded.call),
            Some(BackendCall::GetWorkspace { workspace_id: "ws-9".to_string(), export: true })
        );
    }

    #[tokio::test]
    async fn create_workspace_returns_backend_document() {
        let (app, connector) = app();
        let created =
            json!({ "workspace_id": "ws-new", "name": "pizza-bot", "status": "Training" });
        connector.respond(BackendOperation::CreateWorkspace, Ok(created.clone()));

        let response = call(
            &app,
            post_json(
                "/workspaces",
                json!({ "name": "pizza-bot", "language": "en", "intents": [] }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);
    }

    #[tokio::test]
    async fn create_intent_failure_returns_uniform_envelope() {
        let (app, connector) = app();
        connector.respond(
            BackendOperation::CreateIntent,
            Err(BackendError::http(409, json!({ "error": "Unique violation", "code": 409 }))),
        );

        let response = call(&app, post_json("/intents", json!({ "name": "dup" }))).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "status": 500, "message": "Error posting intent" })
        );
    }
}
