//! HTTP gateway for Casa.
//!
//! - `POST /converse` runs one turn and answers with the reply as a JSON string
//! - `POST /reset` clears the conversation
//! - `GET /health` reports version, echo mode and hub state
//!
//! When a static directory is configured the browser front-end is served
//! too, with the cross-origin isolation headers it needs.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use casa_agent::Assistant;
use casa_config::{AppConfig, GatewayConfig};
use casa_core::event::{DomainEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub assistant: Arc<Assistant>,
}

type SharedState = Arc<GatewayState>;

/// Build the router: API routes, then static routes if configured.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - Permissive CORS
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let mut router = Router::new()
        .route("/converse", post(converse_handler))
        .route("/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    if let Some(static_routes) = static_router(config) {
        router = router.merge(static_routes);
    }

    router
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Routes for the browser front-end, or `None` without a static directory.
fn static_router(config: &GatewayConfig) -> Option<Router> {
    let dir = config.static_dir.as_ref()?;

    let mut router = Router::new()
        .route("/", get(|| async { Redirect::to("/whisper/") }))
        .nest_service("/whisper", ServeDir::new(dir));

    if let Some(worker) = &config.service_worker {
        router = router.route_service("/coi-serviceworker.js", ServeFile::new(worker));
    }

    Some(
        router
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("cross-origin-embedder-policy"),
                HeaderValue::from_static("require-corp"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("access-control-allow-origin"),
                HeaderValue::from_static("*"),
            )),
    )
}

/// Start the gateway HTTP server.
pub async fn start(
    config: AppConfig,
    assistant: Arc<Assistant>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    spawn_event_logger(assistant.event_bus());

    let state = Arc::new(GatewayState { assistant });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log domain events as they happen.
fn spawn_event_logger(bus: &EventBus) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::ResponseGenerated {
                        model, tokens_used, ..
                    } => debug!(model = %model, tokens_used, "Model responded"),
                    DomainEvent::ToolExecuted {
                        tool_name,
                        success,
                        duration_ms,
                        ..
                    } => debug!(tool = %tool_name, success, duration_ms, "Tool executed"),
                    DomainEvent::TurnFailed { error_message, .. } => {
                        debug!(error = %error_message, "Turn failed")
                    }
                    DomainEvent::ConversationReset {
                        discarded_messages, ..
                    } => debug!(discarded_messages, "Conversation reset"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

// --- Errors ---

/// A failed turn, as an HTTP response.
struct TurnError(casa_core::Error);

impl IntoResponse for TurnError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            casa_core::Error::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

// --- Handlers ---

#[derive(Deserialize)]
struct ConverseRequest {
    prompt: String,
}

async fn converse_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ConverseRequest>,
) -> Result<Json<String>, TurnError> {
    info!(prompt_len = payload.prompt.len(), "Converse request received");

    match state.assistant.converse(&payload.prompt).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            error!(error = %e, "Turn failed");
            Err(TurnError(e))
        }
    }
}

async fn reset_handler(State(state): State<SharedState>) -> Json<serde_json::Value> {
    state.assistant.reset().await;
    Json(serde_json::json!({ "status": "reset" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    agent_enabled: bool,
    hub_connected: bool,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        agent_enabled: !state.assistant.echo_mode(),
        hub_connected: state.assistant.devices().has_gateway(),
    })
}
