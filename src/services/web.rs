//! Axum-based dashboard server.
//!
//! Provides:
//! - GET `/api/state` - Current total, color and broker status
//! - POST `/api/action` - Forward a dashboard action (`{"action": "Entry"}`)
//! - GET `/ws` - Live viewer WebSocket
//!
//! Every route requires the shared dashboard secret, either in the
//! `x-dashboard-key` header or as a `key` query parameter.
//!
//! # Viewer protocol
//!
//! On connect the viewer receives a `total_update` with the current count and
//! a `connection` indicator, then every later change as it happens. A viewer
//! may send an action (`{"action":"Exit"}` or just `Exit`) and receives one
//! `action_response` back; nobody else sees it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, Request, State,
    },
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::config::WebConfig;
use crate::traits::{Publisher, ViewerClosed, ViewerSocket};

use super::api::{ActionRequest, ActionResponse, ApiResponse, StateResponse, ViewerEvent};
use super::router::forward_action;
use super::shared::SharedOccupancy;

/// Header carrying the dashboard secret.
pub const KEY_HEADER: &str = "x-dashboard-key";

// ============================================================================
// State
// ============================================================================

/// Everything the handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    occupancy: Arc<SharedOccupancy>,
    publisher: Arc<dyn Publisher>,
    command_topic: Arc<str>,
    secret: Arc<str>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Create handler state.
    pub fn new(
        occupancy: Arc<SharedOccupancy>,
        publisher: Arc<dyn Publisher>,
        command_topic: &str,
        secret: &str,
    ) -> Self {
        Self {
            occupancy,
            publisher,
            command_topic: command_topic.into(),
            secret: secret.into(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Close viewer sessions when `token` fires.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    fn state_response(&self) -> StateResponse {
        StateResponse::new(self.occupancy.snapshot(), self.publisher.connection_state())
    }

    fn forward(&self, action: &str) -> ActionResponse {
        forward_action(self.publisher.as_ref(), &self.command_topic, action)
    }
}

// ============================================================================
// Secret Gate
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct KeyParams {
    key: Option<String>,
}

fn presented_key<'a>(headers: &'a HeaderMap, params: &'a KeyParams) -> Option<&'a str> {
    headers
        .get(KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(params.key.as_deref())
}

/// Compare without short-circuiting on the first differing byte.
fn keys_match(presented: &str, secret: &str) -> bool {
    let (a, b) = (presented.as_bytes(), secret.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

async fn require_key(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = presented_key(request.headers(), &params)
        .is_some_and(|key| keys_match(key, &state.secret));
    if authorized {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "dashboard key rejected");
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::err("Unauthorized")),
        )
            .into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/state - Returns current total, color and broker status
async fn get_state(State(state): State<AppState>) -> Json<ApiResponse<StateResponse>> {
    Json(ApiResponse::ok(state.state_response()))
}

/// POST /api/action - Forward a dashboard action
///
/// Accepts JSON: `{"action": "Entry"}`
async fn post_action(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<ApiResponse<ActionResponse>> {
    let Ok(request) = serde_json::from_slice::<ActionRequest>(&body) else {
        return Json(ApiResponse::err("Invalid action request"));
    };
    Json(ApiResponse::ok(state.forward(&request.action)))
}

/// GET /ws - Upgrade to a viewer session
async fn viewer_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, state))
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Viewer Sessions
// ============================================================================

/// Action name from a viewer frame: a JSON request or the bare name.
fn action_from_frame(text: &str) -> String {
    match serde_json::from_str::<ActionRequest>(text) {
        Ok(request) => request.action,
        Err(_) => text.to_string(),
    }
}

impl ViewerSocket for WebSocket {
    async fn send_text(&mut self, text: String) -> Result<(), ViewerClosed> {
        self.send(Message::Text(text)).await.map_err(|_| ViewerClosed)
    }

    async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.recv().await? {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.send(Message::Close(None)).await;
    }
}

async fn send_events<S: ViewerSocket>(
    socket: &mut S,
    events: &[ViewerEvent],
) -> Result<(), ViewerClosed> {
    for event in events {
        socket.send_text(event.to_json()).await?;
    }
    Ok(())
}

/// Serve one viewer until it leaves, the hub closes or shutdown fires.
///
/// The viewer first gets the current total and the connection indicator,
/// then live events. After falling behind it gets both again, since the
/// dropped events may have included a connection change.
pub async fn viewer_session<S: ViewerSocket>(mut socket: S, state: AppState) {
    let (snapshot, mut updates) = state.occupancy.subscribe_viewer();
    info!(viewers = state.occupancy.viewers().viewer_count(), "viewer joined");

    let joined = [
        ViewerEvent::from(snapshot),
        ViewerEvent::connection(state.publisher.connection_state()),
    ];
    if send_events(&mut socket, &joined).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                socket.close().await;
                break;
            }
            event = updates.recv() => {
                let sent = match event {
                    Ok(event) => send_events(&mut socket, &[event]).await,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "viewer lagged, resyncing");
                        let resync = [
                            ViewerEvent::from(state.occupancy.snapshot()),
                            ViewerEvent::connection(state.publisher.connection_state()),
                        ];
                        send_events(&mut socket, &resync).await
                    }
                    Err(RecvError::Closed) => break,
                };
                if sent.is_err() {
                    break;
                }
            }
            frame = socket.recv_text() => match frame {
                Some(text) => {
                    let response = state.forward(&action_from_frame(&text));
                    if send_events(&mut socket, &[ViewerEvent::from(response)]).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    debug!("viewer left");
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            cors_permissive: false,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: AppState, config: &WebServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/action", post(post_action))
        .route("/ws", get(viewer_socket))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_key))
        .fallback(not_found)
        .with_state(state);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server with shared state
///
/// Runs until `shutdown` fires; open viewer sessions are closed first.
pub async fn run_server_with_state(
    state: AppState,
    config: WebServerConfig,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let state = state.with_shutdown(shutdown.clone());
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "dashboard listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, HeaderValue::from_static("from-header"));
        let params = KeyParams {
            key: Some("from-query".into()),
        };
        assert_eq!(presented_key(&headers, &params), Some("from-header"));
    }

    #[test]
    fn test_query_key() {
        let params = KeyParams {
            key: Some("secret".into()),
        };
        assert_eq!(presented_key(&HeaderMap::new(), &params), Some("secret"));
        assert_eq!(presented_key(&HeaderMap::new(), &KeyParams::default()), None);
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3creT", "s3cret"));
        assert!(!keys_match("s3cre", "s3cret"));
        assert!(!keys_match("", "s3cret"));
    }

    #[test]
    fn test_action_from_frame() {
        assert_eq!(action_from_frame(r#"{"action":"Reset"}"#), "Reset");
        assert_eq!(action_from_frame("SetFull"), "SetFull");
        assert_eq!(action_from_frame("setfull"), "setfull");
    }

    #[test]
    fn test_config_from_web_config() {
        let config = WebServerConfig::from_config(&WebConfig::default().with_port(8081));
        assert_eq!(config.addr.port(), 8081);
    }
}
