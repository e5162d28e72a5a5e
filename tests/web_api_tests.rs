//! Integration tests for the dashboard API.
//!
//! These tests verify the HTTP API endpoints, the secret gate and the
//! viewer session protocol.

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use parking_signal::hal::{MockPublisher, MockViewer, MockViewerClient};
use parking_signal::services::{
    build_router, viewer_session, ActionResponse, ApiResponse, AppState, SharedOccupancy,
    StateResponse, ViewerEvent, WebServerConfig,
};
use parking_signal::sinks::ViewerHub;
use parking_signal::{Command, ConnectionState, Occupancy, SignalColor};

const SECRET: &str = "s3cret";

fn create_test_app(publisher: &MockPublisher) -> (axum::Router, Arc<SharedOccupancy>) {
    let occupancy = Arc::new(SharedOccupancy::new(
        Occupancy::default(),
        vec![],
        ViewerHub::default(),
    ));
    let state = AppState::new(
        Arc::clone(&occupancy),
        Arc::new(publisher.clone()),
        "lot/commands",
        SECRET,
    );
    let router = build_router(state, &WebServerConfig::default());
    (router, occupancy)
}

fn post_action(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/action")
        .header("Content-Type", "application/json")
        .header("x-dashboard-key", SECRET)
        .body(Body::from(body))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_get_state() {
    let publisher = MockPublisher::new();
    let (app, occupancy) = create_test_app(&publisher);
    occupancy.apply(&Command::SetFull);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/state")
                .header("x-dashboard-key", SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json: ApiResponse<StateResponse> = body_json(response).await;
    assert!(json.success);
    assert_eq!(
        json.data.unwrap(),
        StateResponse {
            total: 35,
            color: SignalColor::Red,
            connected: true,
        }
    );
}

#[tokio::test]
async fn test_get_state_reports_disconnected() {
    let publisher = MockPublisher::new();
    publisher.set_state(ConnectionState::Connecting);
    let (app, _) = create_test_app(&publisher);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/state?key=s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: ApiResponse<StateResponse> = body_json(response).await;
    assert!(!json.data.unwrap().connected);
}

#[tokio::test]
async fn test_missing_key_unauthorized() {
    let publisher = MockPublisher::new();
    let (app, _) = create_test_app(&publisher);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_key_unauthorized() {
    let publisher = MockPublisher::new();
    let (app, _) = create_test_app(&publisher);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/action")
                .header("x-dashboard-key", "guess")
                .body(Body::from(r#"{"action": "Entry"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_action_accepted_is_published() {
    let publisher = MockPublisher::new();
    let (app, occupancy) = create_test_app(&publisher);

    let response = app.oneshot(post_action(r#"{"action": "Entry"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: ApiResponse<ActionResponse> = body_json(response).await;
    assert!(json.data.unwrap().accepted);
    assert_eq!(
        publisher.published_to("lot/commands"),
        vec![(b"Entry".to_vec(), false)]
    );
    // The count only moves when the broker echoes the action back.
    assert_eq!(occupancy.snapshot().count, 0);
}

#[tokio::test]
async fn test_invalid_action_rejected() {
    let publisher = MockPublisher::new();
    let (app, _) = create_test_app(&publisher);

    let response = app.oneshot(post_action(r#"{"action": "entry"}"#)).await.unwrap();
    let json: ApiResponse<ActionResponse> = body_json(response).await;

    let data = json.data.unwrap();
    assert!(!data.accepted);
    assert_eq!(data.message, "invalid action: entry");
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_action_while_disconnected() {
    let publisher = MockPublisher::disconnected();
    let (app, _) = create_test_app(&publisher);

    let response = app.oneshot(post_action(r#"{"action": "Reset"}"#)).await.unwrap();
    let json: ApiResponse<ActionResponse> = body_json(response).await;

    assert_eq!(
        json.data.unwrap(),
        ActionResponse::rejected("transport unavailable")
    );
}

#[tokio::test]
async fn test_malformed_action_body() {
    let publisher = MockPublisher::new();
    let (app, _) = create_test_app(&publisher);

    let response = app.oneshot(post_action("not json")).await.unwrap();
    let json: ApiResponse<ActionResponse> = body_json(response).await;

    assert!(!json.success);
    assert_eq!(json.error.as_deref(), Some("Invalid action request"));
}

#[tokio::test]
async fn test_not_found() {
    let publisher = MockPublisher::new();
    let (app, _) = create_test_app(&publisher);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Viewer sessions
// ============================================================================

struct Viewer {
    client: MockViewerClient,
    task: tokio::task::JoinHandle<()>,
}

fn spawn_viewer(
    publisher: &MockPublisher,
    occupancy: &Arc<SharedOccupancy>,
    shutdown: &CancellationToken,
) -> Viewer {
    let state = AppState::new(
        Arc::clone(occupancy),
        Arc::new(publisher.clone()),
        "lot/commands",
        SECRET,
    )
    .with_shutdown(shutdown.clone());
    let (socket, client) = MockViewer::pair();
    let task = tokio::spawn(viewer_session(socket, state));
    Viewer { client, task }
}

fn viewer_occupancy(capacity: usize) -> Arc<SharedOccupancy> {
    Arc::new(SharedOccupancy::new(
        Occupancy::default(),
        vec![],
        ViewerHub::new(capacity),
    ))
}

async fn next_event(client: &mut MockViewerClient) -> ViewerEvent {
    let frame = client.recv().await.expect("session ended");
    serde_json::from_str(&frame).unwrap()
}

fn total(total: u32, color: SignalColor) -> ViewerEvent {
    ViewerEvent::TotalUpdate { total, color }
}

#[tokio::test]
async fn test_viewer_gets_current_total_then_live_updates() {
    let publisher = MockPublisher::new();
    let occupancy = viewer_occupancy(32);
    occupancy.apply(&Command::SetFull);
    let shutdown = CancellationToken::new();
    let mut viewer = spawn_viewer(&publisher, &occupancy, &shutdown);

    assert_eq!(next_event(&mut viewer.client).await, total(35, SignalColor::Red));
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::Connection { connected: true }
    );

    occupancy.apply(&Command::Decrement);
    assert_eq!(next_event(&mut viewer.client).await, total(34, SignalColor::Yellow));

    occupancy.viewers().announce_connection(ConnectionState::Disconnected);
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::Connection { connected: false }
    );

    shutdown.cancel();
    viewer.task.await.unwrap();
    assert!(viewer.client.was_closed());
    assert_eq!(viewer.client.recv().await, None);
}

#[tokio::test]
async fn test_viewer_action_gets_one_response() {
    let publisher = MockPublisher::new();
    let occupancy = viewer_occupancy(32);
    let shutdown = CancellationToken::new();
    let mut viewer = spawn_viewer(&publisher, &occupancy, &shutdown);
    next_event(&mut viewer.client).await;
    next_event(&mut viewer.client).await;

    viewer.client.send(r#"{"action":"Exit"}"#);
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::from(ActionResponse::accepted("Exit sent"))
    );
    assert!(viewer.client.try_recv().is_none());

    viewer.client.send("Exit");
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::from(ActionResponse::accepted("Exit sent"))
    );
    assert_eq!(
        publisher.published_to("lot/commands"),
        vec![(b"Exit".to_vec(), false), (b"Exit".to_vec(), false)]
    );

    viewer.client.send("exit");
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::from(ActionResponse::rejected("invalid action: exit"))
    );
    assert!(viewer.client.try_recv().is_none());

    publisher.set_state(ConnectionState::Disconnected);
    viewer.client.send("Reset");
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::from(ActionResponse::rejected("transport unavailable"))
    );
    assert!(viewer.client.try_recv().is_none());
    assert_eq!(publisher.published_to("lot/commands").len(), 2);
    // Forwarded actions never touch the count directly.
    assert_eq!(occupancy.snapshot().count, 0);

    viewer.client.hang_up();
    viewer.task.await.unwrap();
    assert!(!viewer.client.was_closed());
}

#[tokio::test]
async fn test_lagging_viewer_resyncs_total_and_indicator() {
    let publisher = MockPublisher::new();
    let occupancy = viewer_occupancy(4);
    let shutdown = CancellationToken::new();
    let mut viewer = spawn_viewer(&publisher, &occupancy, &shutdown);
    next_event(&mut viewer.client).await;
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::Connection { connected: true }
    );

    // The session cannot run until this test yields, so the buffer overflows
    // and the connection change is among the dropped events.
    publisher.set_state(ConnectionState::Disconnected);
    occupancy.viewers().announce_connection(ConnectionState::Disconnected);
    for _ in 0..10 {
        occupancy.apply(&Command::Increment);
    }

    assert_eq!(next_event(&mut viewer.client).await, total(10, SignalColor::Green));
    assert_eq!(
        next_event(&mut viewer.client).await,
        ViewerEvent::Connection { connected: false }
    );

    shutdown.cancel();
    viewer.task.await.unwrap();
}
