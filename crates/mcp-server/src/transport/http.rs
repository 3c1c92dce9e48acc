//! HTTP/SSE transport for MCP
//!
//! `POST /mcp` answers JSON-RPC directly. A client holding an SSE stream from
//! `GET /mcp/sse` posts to the announced endpoint instead, and receives the
//! responses as `message` events on that stream.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use dashmap::DashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ServerError;
use crate::protocol::{McpError, McpMessage, RequestHandler};

/// Buffered responses per SSE session
const SESSION_BUFFER: usize = 32;

/// Shared state for HTTP handlers
struct AppState {
    handler: Arc<RequestHandler>,
    sessions: DashMap<Uuid, mpsc::Sender<McpMessage>>,
}

impl AppState {
    fn new(handler: Arc<RequestHandler>) -> Self {
        Self {
            handler,
            sessions: DashMap::new(),
        }
    }
}

/// Removes an SSE session from the table when its stream is dropped
struct SessionGuard {
    state: Arc<AppState>,
    session_id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.state.sessions.remove(&self.session_id).is_some() {
            debug!("SSE session {} closed", self.session_id);
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<Uuid>,
}

/// HTTP transport for MCP protocol
pub struct HttpTransport {
    handler: Arc<RequestHandler>,
    bind: String,
    port: u16,
}

impl HttpTransport {
    pub fn new(handler: Arc<RequestHandler>, bind: impl Into<String>, port: u16) -> Self {
        Self {
            handler,
            bind: bind.into(),
            port,
        }
    }

    /// Run the HTTP server
    pub async fn run(&self) -> Result<(), ServerError> {
        let app = router(self.handler.clone());

        let addr = format!("{}:{}", self.bind, self.port);
        info!("Starting MCP HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the HTTP router around `handler`
pub fn router(handler: Arc<RequestHandler>) -> Router {
    routes(Arc::new(AppState::new(handler)))
}

fn routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/mcp", post(handle_mcp_request))
        .route("/mcp/sse", get(handle_mcp_sse))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

/// Handle MCP JSON-RPC request via HTTP POST
async fn handle_mcp_request(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let message: McpMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse HTTP message: {}", e);
            let response = McpMessage::error_response(None, McpError::parse_error());
            return Json(response).into_response();
        }
    };

    debug!("HTTP request: {:?}", message);

    match query.session_id {
        Some(session_id) => route_to_session(&state, session_id, message).await,
        None => match state.handler.handle(message).await {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
    }
}

/// Answer a message on the SSE stream of `session_id`
async fn route_to_session(state: &AppState, session_id: Uuid, message: McpMessage) -> Response {
    let sender = match state.sessions.get(&session_id) {
        Some(sender) => sender.clone(),
        None => return (StatusCode::NOT_FOUND, "Unknown session").into_response(),
    };

    if let Some(response) = state.handler.handle(message).await {
        if sender.send(response).await.is_err() {
            debug!("SSE session {} closed", session_id);
            state.sessions.remove(&session_id);
            return (StatusCode::GONE, "Session closed").into_response();
        }
    }

    StatusCode::ACCEPTED.into_response()
}

/// Open an SSE session
async fn handle_mcp_sse(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let (sender, mut receiver) = mpsc::channel::<McpMessage>(SESSION_BUFFER);
    state.sessions.insert(session_id, sender);

    info!("SSE connection established: {}", session_id);

    let guard = SessionGuard {
        state: state.clone(),
        session_id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;

        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/mcp?session_id={}", session_id)));

        while let Some(message) = receiver.recv().await {
            match Event::default().event("message").json_data(&message) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("Dropping unserializable SSE message: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
