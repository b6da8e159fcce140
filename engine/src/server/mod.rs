//! Task submission server
//!
//! HTTP and WebSocket surface over the [`CentralDispatcher`].
//!
//! # Endpoints
//!
//! - POST /api/complete_task - Run a task to completion, return the summary
//! - GET /ws - Stream one frame per design round, then the sentinel
//! - GET /api/agents - List registered design agents
//! - GET /api/status - Liveness

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sdk::{EngineError, TaskDesignResult, TaskSpec, TunerErrorExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::design::{run_streaming_session, ResultTransport};
use crate::dispatcher::CentralDispatcher;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<CentralDispatcher>,
    provider: String,
    started: Instant,
}

impl AppState {
    pub fn new(dispatcher: Arc<CentralDispatcher>, provider: impl Into<String>) -> Self {
        Self {
            dispatcher,
            provider: provider.into(),
            started: Instant::now(),
        }
    }
}

/// Router with every endpoint mounted
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/complete_task", post(complete_task_handler))
        .route("/api/agents", get(agents_handler))
        .route("/api/status", get(status_handler))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let local = listener
        .local_addr()
        .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;
    tracing::info!("Tuner server listening on http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("Server error: {}", e)))
}

/// HTTP status for an engine error
pub fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::InvalidTaskSpec(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::MalformedResponse(_)
        | EngineError::LLMProvider(_)
        | EngineError::Oracle(_)
        | EngineError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(error: &EngineError) -> serde_json::Value {
    json!({
        "error": error.to_string(),
        "hint": error.user_hint(),
    })
}

fn error_response(error: EngineError) -> Response {
    (status_for(&error), Json(error_body(&error))).into_response()
}

async fn complete_task_handler(
    State(state): State<AppState>,
    Json(spec): Json<TaskSpec>,
) -> Response {
    tracing::info!("Task {:?} submitted", spec.id);
    match state.dispatcher.complete_task(&spec).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::warn!("Task {:?} failed: {}", spec.id, e);
            error_response(e)
        }
    }
}

async fn agents_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let agents: Vec<_> = state.dispatcher.registry().iter().collect();
    Json(json!({ "agents": agents }))
}

async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider,
        "agents": state.dispatcher.registry().len(),
        "uptime_secs": state.started.elapsed().as_secs(),
    }))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session = Uuid::new_v4();
    ws.on_upgrade(move |socket| {
        handle_websocket(socket, state)
            .instrument(tracing::info_span!("ws_session", id = %session))
    })
}

/// Result transport writing JSON text frames to a WebSocket
pub struct WebSocketTransport {
    sink: SplitSink<WebSocket, Message>,
    closed: bool,
}

impl WebSocketTransport {
    fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink,
            closed: false,
        }
    }

    async fn send_error(&mut self, error: &EngineError) {
        if self.closed {
            return;
        }
        let frame = Message::Text(error_body(error).to_string());
        if self.sink.send(frame).await.is_ok() {
            let _ = self.sink.send(Message::Close(None)).await;
        }
        self.closed = true;
    }
}

#[async_trait::async_trait]
impl ResultTransport for WebSocketTransport {
    async fn send(&mut self, result: &TaskDesignResult) -> Result<(), EngineError> {
        let text = serde_json::to_string(result)
            .map_err(|e| EngineError::TransportDisconnected(e.to_string()))?;
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| EngineError::TransportDisconnected(e.to_string()))
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        self.closed = true;
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| EngineError::TransportDisconnected(e.to_string()))
    }
}

/// Read the TaskSpec frame that opens a session
async fn read_task_spec(stream: &mut SplitStream<WebSocket>) -> Result<TaskSpec, EngineError> {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return serde_json::from_str(&text)
                    .map_err(|e| EngineError::InvalidTaskSpec(e.to_string()));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(EngineError::TransportDisconnected(e.to_string())),
        }
    }
    Err(EngineError::TransportDisconnected(
        "client closed before sending a task".to_string(),
    ))
}

/// Resolve once the client closes its side of the socket
async fn wait_for_disconnect(stream: &mut SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        if matches!(message, Ok(Message::Close(_)) | Err(_)) {
            break;
        }
    }
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket session opened");
    let (sink, mut stream) = socket.split();
    let mut transport = WebSocketTransport::new(sink);

    let spec = match read_task_spec(&mut stream).await {
        Ok(spec) => spec,
        Err(e) => {
            tracing::warn!("No usable task received: {}", e);
            transport.send_error(&e).await;
            return;
        }
    };

    let mut agent = match state.dispatcher.prepare_agent(&spec).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::warn!("Dispatch failed for task {:?}: {}", spec.id, e);
            transport.send_error(&e).await;
            return;
        }
    };

    let token = CancellationToken::new();
    let outcome = tokio::select! {
        outcome = run_streaming_session(agent.as_mut(), &mut transport, token.clone()) => outcome,
        _ = wait_for_disconnect(&mut stream) => {
            token.cancel();
            Err(EngineError::Cancelled)
        }
    };

    match outcome {
        Ok(summary) => tracing::info!(
            "Streamed {} round(s) for task {:?}, success: {}",
            summary.design_history.len(),
            spec.id,
            summary.is_success
        ),
        Err(EngineError::Cancelled) | Err(EngineError::TransportDisconnected(_)) => {
            tracing::info!("Client went away, design loop for task {:?} dropped", spec.id)
        }
        Err(e) => {
            tracing::warn!("Streaming task {:?} failed: {}", spec.id, e);
            transport.send_error(&e).await;
        }
    }
}
