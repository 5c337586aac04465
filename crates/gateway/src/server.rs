//! Axum-based HTTP/SSE server fronting the orchestrator.

use axum::{
    extract::{rejection::JsonRejection, Json, Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use switchboard_core::config::ServerConfig;
use switchboard_core::{Error, Result};
use switchboard_orchestrator::{AgentInfo, OrchestratorAgent, ORCHESTRATOR_NAME};

/// Terminal SSE frame.
const DONE_SENTINEL: &str = "[DONE]";

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<OrchestratorAgent>,
}

/// Gateway server.
pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    pub fn new(config: ServerConfig, orchestrator: Arc<OrchestratorAgent>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { orchestrator }),
            metrics_handle: None,
        }
    }

    /// Expose Prometheus metrics at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/api/v1/agents", get(agents_handler))
            .route("/api/v1/query", post(query_handler))
            .route("/api/v1/query/stream", post(stream_query_handler))
            .route("/api/v1/{agent}/query", post(direct_query_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router = router.layer(middleware::from_fn(track_metrics));
        router = router.layer(self.cors_layer());
        router = router.layer(TraceLayer::new_for_http());
        router
    }

    fn cors_layer(&self) -> CorsLayer {
        if self.config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<HeaderValue> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Switchboard gateway starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::gateway(format!("server error: {}", e)))?;
        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Orchestrator query request.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub session_id: Option<String>,
}

/// Direct-bypass query request.
#[derive(Debug, Deserialize)]
pub struct DirectQueryRequest {
    pub query: String,
}

/// Query response, buffered endpoints. `session_id` is always set on the
/// orchestrator path (echoed or freshly minted).
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub success: bool,
    pub session_id: String,
    pub agent_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Per-agent availability: "available" or "unavailable".
    pub agents: HashMap<String, String>,
}

/// Agent list response.
#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
    pub count: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Record request metrics for every route.
async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    crate::metrics::track_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let health = state.orchestrator.registry().health_check_all().await;
    let any_available = health.is_empty() || health.values().any(|healthy| *healthy);

    let agents: HashMap<String, String> = health
        .into_iter()
        .map(|(name, healthy)| {
            let status = if healthy { "available" } else { "unavailable" };
            (name, status.to_string())
        })
        .collect();

    let body = HealthResponse {
        status: if any_available { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agents,
    };
    let code = if any_available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> Response {
    let agents = state.orchestrator.registry().agents_info();
    let count = agents.len();
    (StatusCode::OK, Json(AgentsResponse { agents, count })).into_response()
}

/// Buffered orchestrator query.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let session_hint = request.session_id.clone().unwrap_or_default();

    let deadline = state.orchestrator.config().query_timeout();
    let work = state
        .orchestrator
        .process(&request.query, request.session_id.as_deref());

    match tokio::time::timeout(deadline, work).await {
        Ok(Ok(outcome)) => {
            let body = QueryResponse {
                response: outcome.response.content,
                success: outcome.response.success,
                session_id: outcome.session_id,
                agent_used: outcome.response.agent_name,
                error: outcome.response.error,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => error_response(e, session_hint),
        Err(_) => timeout_response(StatusCode::OK, session_hint),
    }
}

/// Streaming orchestrator query over SSE.
///
/// Frames are `data: {"text": ..., "session_id": ...}`; the stream ends with
/// `data: [DONE]` iff no error occurred. Client disconnect cancels the
/// in-flight dispatch; the configured deadline returns 504 only while no
/// chunk has been sent.
async fn stream_query_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let session_hint = request.session_id.clone().unwrap_or_default();

    let cancel = CancellationToken::new();
    let outcome = match state
        .orchestrator
        .stream(&request.query, request.session_id.as_deref(), cancel.clone())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return error_response(e, session_hint),
    };
    let session_id = outcome.session_id;
    let mut chunks = outcome.chunks;

    // The deadline applies until the first chunk; afterwards the stream is
    // paced by the agent.
    let deadline = state.orchestrator.config().query_timeout();
    let first = tokio::select! {
        item = chunks.next() => item,
        _ = tokio::time::sleep(deadline) => {
            cancel.cancel();
            return timeout_response(StatusCode::GATEWAY_TIMEOUT, session_id);
        }
    };

    let (frame_tx, frame_rx) = mpsc::channel::<std::result::Result<Event, Infallible>>(16);
    let framer_session = session_id.clone();
    let framer_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut item = first;
        let mut errored = false;
        loop {
            match item {
                Some(Ok(text)) => {
                    let frame = text_frame(&text, &framer_session, false);
                    if frame_tx.send(Ok(frame)).await.is_err() {
                        // Client went away between frames.
                        framer_cancel.cancel();
                        return;
                    }
                }
                Some(Err(e)) => {
                    errored = true;
                    let frame = text_frame(&stream_error_text(&e), &framer_session, true);
                    let _ = frame_tx.send(Ok(frame)).await;
                    break;
                }
                None => break,
            }
            item = chunks.next().await;
        }
        if !errored {
            let _ = frame_tx.send(Ok(Event::default().data(DONE_SENTINEL))).await;
        }
    });

    // Dropping the response body (client disconnect) cancels the dispatch.
    let guard = cancel.drop_guard();
    let frames = ReceiverStream::new(frame_rx).map(move |item| {
        let _ = &guard;
        item
    });

    let mut response = Sse::new(frames).into_response();
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

/// Direct bypass of the router: query one agent by name.
async fn direct_query_handler(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    payload: std::result::Result<Json<DirectQueryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let deadline = state.orchestrator.config().agent_timeout(&agent);
    let work = state.orchestrator.process_direct(&agent, &request.query);

    match tokio::time::timeout(deadline, work).await {
        Ok(Ok(response)) => {
            let body = QueryResponse {
                response: response.content,
                success: response.success,
                session_id: String::new(),
                agent_used: response.agent_name,
                error: response.error,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => error_response(e, String::new()),
        Err(_) => timeout_response(StatusCode::OK, String::new()),
    }
}

// =============================================================================
// Response helpers
// =============================================================================

fn text_frame(text: &str, session_id: &str, error: bool) -> Event {
    let mut body = serde_json::json!({
        "text": text,
        "session_id": session_id,
    });
    if error {
        body["error"] = serde_json::json!(true);
    }
    Event::default().data(body.to_string())
}

/// User-visible text for an error chunk.
fn stream_error_text(error: &Error) -> String {
    match error {
        Error::RateLimited(message) => message.clone(),
        _ => "I'm sorry, I encountered an error processing your request.".to_string(),
    }
}

fn bad_request(message: String) -> Response {
    let body = QueryResponse {
        response: String::new(),
        success: false,
        session_id: String::new(),
        agent_used: ORCHESTRATOR_NAME.to_string(),
        error: Some(message),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn timeout_response(code: StatusCode, session_id: String) -> Response {
    let body = QueryResponse {
        response: String::new(),
        success: false,
        session_id,
        agent_used: ORCHESTRATOR_NAME.to_string(),
        error: Some("timeout".to_string()),
    };
    (code, Json(body)).into_response()
}

/// Map application errors to the wire shape in a single place; nothing below
/// this layer constructs HTTP status codes.
fn error_response(error: Error, session_id: String) -> Response {
    let (code, kind) = match &error {
        Error::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        Error::UnknownAgent(name) => (StatusCode::NOT_FOUND, format!("unknown agent '{}'", name)),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    let body = QueryResponse {
        response: String::new(),
        success: false,
        session_id,
        agent_used: ORCHESTRATOR_NAME.to_string(),
        error: Some(kind),
    };
    (code, Json(body)).into_response()
}
