//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{activity_row, message_row, test_app, test_app_without_channel};

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::GET)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// Health always reports ok with a parseable timestamp.
#[tokio::test]
async fn test_health_endpoint() {
    let ctx = test_app().await;

    let response = ctx.app.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    let ts = json["timestamp"].as_str().unwrap();
    chrono::DateTime::parse_from_rfc3339(ts).expect("timestamp must be RFC 3339");
}

/// Unknown routes fall through to a uniform JSON 404.
#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let ctx = test_app().await;

    let response = ctx
        .app
        .clone()
        .oneshot(get("/api/calendar/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn test_list_chat_newest_first() {
    let ctx = test_app().await;
    ctx.db
        .insert_message(&message_row("m1", "hi", false, "2026-01-01T00:00:01.000Z"))
        .await
        .unwrap();
    ctx.db
        .insert_message(&message_row("m2", "hello", true, "2026-01-01T00:00:02.000Z"))
        .await
        .unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(get("/api/list?kind=chat"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "m2");
    assert_eq!(items[0]["sender"], "agent");
    assert_eq!(items[0]["agent_name"], "Agent");
    assert_eq!(items[1]["id"], "m1");
    assert_eq!(items[1]["sender"], "user");
}

#[tokio::test]
async fn test_list_activity_fields() {
    let ctx = test_app().await;
    ctx.db
        .insert_activity(&activity_row("a1", "task_run", "2026-01-01T00:00:01.000Z"))
        .await
        .unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(get("/api/list?kind=activity"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "task_run");
    assert_eq!(items[0]["status"], "success");
    assert_eq!(items[0]["duration_ms"], 1200);
}

#[tokio::test]
async fn test_list_requires_known_kind() {
    let ctx = test_app().await;

    let response = ctx.app.clone().oneshot(get("/api/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(get("/api/list?kind=calendar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// An unknown channel reads as empty, not as an error.
#[tokio::test]
async fn test_list_unknown_channel_is_empty() {
    let ctx = test_app().await;

    let response = ctx
        .app
        .clone()
        .oneshot(get("/api/list?kind=chat&channel=ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_submit_writes_envelope() {
    let ctx = test_app().await;

    let response = ctx
        .app
        .clone()
        .oneshot(post_json("/api/submit", &json!({"text": "hello agent"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let input_dir = ctx.queue.path().join("main").join("input");
    let files: Vec<_> = std::fs::read_dir(&input_dir).unwrap().collect();
    assert_eq!(files.len(), 1);

    let body = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["type"], "message");
    assert_eq!(envelope["channel"], common::CHANNEL_ID);
    assert_eq!(envelope["text"], "hello agent");
    assert_eq!(envelope["source"], "dashboard");
}

#[tokio::test]
async fn test_submit_rejects_blank_text() {
    let ctx = test_app().await;

    for payload in [json!({"text": ""}), json!({"text": "   "}), json!({})] {
        let response = ctx
            .app
            .clone()
            .oneshot(post_json("/api/submit", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Nothing may reach the queue for a rejected submission.
    assert!(!ctx.queue.path().join("main").exists());
}

#[tokio::test]
async fn test_submit_rejects_malformed_json() {
    let ctx = test_app().await;

    let request = Request::builder()
        .uri("/api/submit")
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// An unregistered channel is a failure response, never a fallback write.
#[tokio::test]
async fn test_submit_unresolved_channel() {
    let ctx = test_app_without_channel().await;

    let response = ctx
        .app
        .clone()
        .oneshot(post_json("/api/submit", &json!({"text": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("not registered"));

    assert_eq!(std::fs::read_dir(ctx.queue.path()).unwrap().count(), 0);
}
