//! Handler tests over the in-memory store.

use std::sync::Arc;

use api_adapters::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use services::{Ports, Services};
use storage_adapters::MemoryStore;
use tower::ServiceExt;

fn app() -> Router {
    let ports = Ports::shared(Arc::new(MemoryStore::new()));
    router(AppState::new(Services::new(ports, 0)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed(app: &Router) {
    let (status, _) = call(
        app,
        "POST",
        "/api/user/alice/create",
        Some(json!({"fullname": "Alice", "email": "alice@example.org", "about": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        app,
        "POST",
        "/api/forum/create",
        Some(json!({"slug": "rust", "title": "Rust", "user": "ALICE"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, thread) = call(
        app,
        "POST",
        "/api/forum/rust/create",
        Some(json!({"title": "Ownership", "author": "alice", "message": "?", "slug": "own"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(thread["id"], 1);
}

#[tokio::test]
async fn duplicate_user_returns_conflicting_profiles() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/user/Alice/create",
        Some(json!({"fullname": "Other", "email": "other@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["nickname"], "alice");
}

#[tokio::test]
async fn forum_owner_is_canonicalized() {
    let app = app();
    seed(&app).await;

    let (status, forum) = call(&app, "GET", "/api/forum/RUST/details", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forum["user"], "alice");
    assert_eq!(forum["threads"], 1);
}

#[tokio::test]
async fn post_batch_and_tree_listing() {
    let app = app();
    seed(&app).await;

    let (status, posts) = call(
        &app,
        "POST",
        "/api/thread/own/create",
        Some(json!([
            {"author": "alice", "message": "root"},
            {"author": "alice", "message": "second root"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posts[0]["created"], posts[1]["created"]);

    let (status, _) = call(
        &app,
        "POST",
        "/api/thread/1/create",
        Some(json!([{"author": "alice", "message": "reply", "parent": 1}])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = call(&app, "GET", "/api/thread/own/posts?sort=tree", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3, 2]);
    assert_eq!(page[1]["parent"], 1);
    assert_eq!(page[1]["isEdited"], false);
}

#[tokio::test]
async fn missing_parent_rejects_the_batch_with_conflict() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/thread/own/create",
        Some(json!([
            {"author": "alice", "message": "ok"},
            {"author": "alice", "message": "orphan", "parent": 77},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (_, status_body) = call(&app, "GET", "/api/service/status", None).await;
    assert_eq!(status_body["post"], 0);
}

#[tokio::test]
async fn unknown_author_and_thread_are_not_found() {
    let app = app();
    seed(&app).await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/thread/own/create",
        Some(json!([{"author": "nobody", "message": "hi"}])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/api/thread/missing/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_since_is_a_bad_request() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(&app, "GET", "/api/thread/own/posts?since=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = app();
    seed(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/thread/own/vote",
        Some(json!({"nickname": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn flipping_a_vote_moves_the_rating_by_two() {
    let app = app();
    seed(&app).await;

    let (status, thread) = call(
        &app,
        "POST",
        "/api/thread/own/vote",
        Some(json!({"nickname": "alice", "voice": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["votes"], 1);

    let (_, thread) = call(
        &app,
        "POST",
        "/api/thread/1/vote",
        Some(json!({"nickname": "ALICE", "voice": -1})),
    )
    .await;
    assert_eq!(thread["votes"], -1);
}

#[tokio::test]
async fn post_details_expand_requested_relations() {
    let app = app();
    seed(&app).await;
    call(
        &app,
        "POST",
        "/api/thread/own/create",
        Some(json!([{"author": "alice", "message": "root"}])),
    )
    .await;

    let (status, details) = call(&app, "GET", "/api/post/1/details?related=user,thread", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["post"]["id"], 1);
    assert_eq!(details["author"]["nickname"], "alice");
    assert_eq!(details["thread"]["slug"], "own");
    assert!(details.get("forum").is_none());

    let (status, post) = call(
        &app,
        "POST",
        "/api/post/1/details",
        Some(json!({"message": "edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["isEdited"], true);

    let (status, _) = call(&app, "GET", "/api/post/99/details", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_empties_the_store() {
    let app = app();
    seed(&app).await;

    let (status, _) = call(&app, "POST", "/api/service/clear", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/api/service/status", None).await;
    assert_eq!(body, json!({"user": 0, "forum": 0, "thread": 0, "post": 0}));
}
