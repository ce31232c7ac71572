//! HTTP server mode for REST API access to connector operations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::definition::ConnectorDefinition;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::Document;

/// Query string for the definition listing
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    /// Include retired definitions
    #[serde(default)]
    all: bool,
}

/// Request body for definition enrichment
#[derive(Debug, Default, Deserialize)]
struct DefinitionRequest {
    #[serde(default)]
    resource_config: Option<Document>,
    #[serde(default)]
    component_config: Option<Document>,
}

/// Request body for the test endpoint
#[derive(Debug, Deserialize)]
struct TestRequest {
    uid: Uuid,
    #[serde(default)]
    config: Document,
}

/// Request body for the execute endpoint
#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    uid: Uuid,
    task: String,
    #[serde(default)]
    config: Document,
    #[serde(default)]
    inputs: Vec<Document>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(data: T, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(msg.into()),
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// HTTP status for a connector error
fn status_of(err: &Error) -> StatusCode {
    match err.root() {
        Error::UnknownDefinition { .. } => StatusCode::NOT_FOUND,
        Error::Config { .. }
        | Error::MissingConfigField { .. }
        | Error::TaskNotSupported { .. }
        | Error::InvalidAuthType
        | Error::Auth { .. }
        | Error::InvalidInput { .. }
        | Error::JsonParse(_) => StatusCode::BAD_REQUEST,
        Error::Transport { .. }
        | Error::VendorStatus { .. }
        | Error::Decode { .. }
        | Error::VendorFailure { .. }
        | Error::Container { .. }
        | Error::Redis(_)
        | Error::Storage { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Error) -> Response {
    (
        status_of(err),
        Json(ApiResponse::<()>::error(err.end_user_message())),
    )
        .into_response()
}

/// Routes over a shared registry
pub fn router(registry: Arc<Registry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/definitions", get(list_definitions))
        .route("/definitions/:key", get(get_definition).post(enrich_definition))
        .route("/test", post(test_connection))
        .route("/execute", post(execute))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Start the HTTP server
pub async fn serve(registry: Arc<Registry>, port: u16) -> Result<()> {
    let app = router(registry);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_definitions(
    State(registry): State<Arc<Registry>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let defs: Vec<&ConnectorDefinition> = registry.definitions(query.all);
    (StatusCode::OK, Json(ApiResponse::success(defs))).into_response()
}

/// Look a definition up by ID, falling back to UID when the key parses as one
async fn lookup(
    registry: &Registry,
    key: &str,
    req: &DefinitionRequest,
) -> Result<ConnectorDefinition> {
    let resource = req.resource_config.as_ref();
    let component = req.component_config.as_ref();
    match registry.definition_by_id(key, resource, component).await {
        Err(e @ Error::UnknownDefinition { .. }) => match Uuid::parse_str(key) {
            Ok(uid) => registry.definition_by_uid(&uid, resource, component).await,
            Err(_) => Err(e),
        },
        other => other,
    }
}

async fn get_definition(
    State(registry): State<Arc<Registry>>,
    Path(key): Path<String>,
) -> Response {
    match lookup(&registry, &key, &DefinitionRequest::default()).await {
        Ok(def) => (StatusCode::OK, Json(ApiResponse::success(def))).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn enrich_definition(
    State(registry): State<Arc<Registry>>,
    Path(key): Path<String>,
    Json(req): Json<DefinitionRequest>,
) -> Response {
    match lookup(&registry, &key, &req).await {
        Ok(def) => (StatusCode::OK, Json(ApiResponse::success(def))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// A failed check is still a successful request: the state is `STATE_ERROR`
async fn test_connection(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<TestRequest>,
) -> Response {
    match registry.test(req.uid, &req.config).await {
        Ok(state) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "state": state.to_string() }))),
        )
            .into_response(),
        Err(e @ Error::UnknownDefinition { .. }) => error_response(&e),
        Err(e) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "state": "STATE_ERROR",
                "message": e.end_user_message()
            }))),
        )
            .into_response(),
    }
}

async fn execute(State(registry): State<Arc<Registry>>, Json(req): Json<ExecuteRequest>) -> Response {
    let execution = match registry.create_execution(req.uid, &req.task, &req.config) {
        Ok(execution) => execution,
        Err(e) => return error_response(&e),
    };

    tracing::info!(uid = %req.uid, task = %req.task, inputs = req.inputs.len(), "Executing task");
    match execution.execute(req.inputs).await {
        Ok(outputs) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "outputs": outputs }))),
        )
            .into_response(),
        Err(e) => {
            let body: Value = json!({
                "outputs": e.partial_outputs(),
                "failed_index": e.failed_index(),
            });
            (
                status_of(&e),
                Json(ApiResponse::failure(body, e.end_user_message())),
            )
                .into_response()
        }
    }
}
