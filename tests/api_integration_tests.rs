//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle over the in-process wiring: cache
//! chain, publisher, queue, consumer and search index.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cache_chain::api::create_router;
use cache_chain::config::PayloadMode;
use cache_chain::models::{Hotel, User};
use cache_chain::{build_entity, AppState, Backends, Config, WorkerHandles};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// == Helper Functions ==

struct TestApp {
    router: Router,
    shutdown: CancellationToken,
    _workers: Vec<WorkerHandles>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_app(config: Config) -> TestApp {
    let backends = Backends::in_memory(&config);
    let (hotels, hotel_workers) = build_entity::<Hotel>(&config, &backends, &config.hotels_queue)
        .await
        .unwrap();
    let (users, user_workers) = build_entity::<User>(&config, &backends, &config.users_queue)
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let workers = vec![hotel_workers.spawn(&shutdown), user_workers.spawn(&shutdown)];

    TestApp {
        router: create_router(AppState::new(hotels, users, &config)),
        shutdown,
        _workers: workers,
    }
}

async fn create_test_app() -> TestApp {
    spawn_app(Config::default()).await
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn create_hotel(app: &TestApp, body: Value) -> String {
    let (status, json) = send(app, "POST", "/hotels", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    json["id"].as_str().unwrap().to_string()
}

fn ids(results: &Value) -> Vec<String> {
    results
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["id"].as_str().unwrap().to_string())
        .collect()
}

/// Polls a search URI until it returns `expected` ids, since indexing is asynchronous.
async fn wait_for_search(app: &TestApp, uri: &str, expected: &[&str]) -> Value {
    let mut last = Value::Null;
    for _ in 0..100 {
        let (status, json) = send(app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        if ids(&json) == expected {
            return json;
        }
        last = json;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("search {} never returned {:?}, last: {}", uri, expected, last);
}

// == Hotel Lifecycle ==

#[tokio::test]
async fn test_hotel_create_get_search_delete() {
    let app = create_test_app().await;

    let id = create_hotel(
        &app,
        json!({"name": "Sheraton", "address": "701 E 11th St", "city": "Austin", "state": "TX", "rating": 4.2}),
    )
    .await;

    let (status, hotel) = send(&app, "GET", &format!("/hotels/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hotel["name"], "Sheraton");
    assert_eq!(hotel["id"], id.as_str());

    let results = wait_for_search(&app, "/search?q=Sheraton", &[id.as_str()]).await;
    assert_eq!(results[0]["city"], "Austin");

    let (status, deleted) = send(&app, "DELETE", &format!("/hotels/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());

    let (status, json) = send(&app, "GET", &format!("/hotels/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains(&id));

    wait_for_search(&app, "/search?q=Sheraton", &[]).await;
}

#[tokio::test]
async fn test_get_unknown_hotel_is_not_found() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/hotels/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_read_after_write_hits_local_cache() {
    let app = create_test_app().await;
    let id = create_hotel(&app, json!({"name": "Hilton"})).await;

    send(&app, "GET", &format!("/hotels/{}", id), None).await;
    send(&app, "GET", &format!("/hotels/{}", id), None).await;

    let (status, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let tiers = stats["hotels"]["chain"]["tier_hits"].as_array().unwrap();
    assert_eq!(tiers[0]["tier"], "local");
    assert_eq!(tiers[0]["hits"], 2);
    assert_eq!(tiers[2]["hits"], 0);
    assert_eq!(stats["hotels"]["local_cache"]["hits"], 2);
}

#[tokio::test]
async fn test_partial_update() {
    let app = create_test_app().await;
    let id = create_hotel(
        &app,
        json!({"name": "Sheraton", "city": "Austin", "rating": 4.0, "amenities": ["pool"]}),
    )
    .await;

    let (status, merged) = send(
        &app,
        "PUT",
        &format!("/hotels/{}", id),
        Some(json!({"city": "Dallas"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["city"], "Dallas");
    assert_eq!(merged["name"], "Sheraton");
    assert_eq!(merged["amenities"], json!(["pool"]));

    let (_, hotel) = send(&app, "GET", &format!("/hotels/{}", id), None).await;
    assert_eq!(hotel, merged);

    let (status, _) = send(&app, "PUT", &format!("/hotels/{}", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "PUT", "/hotels/404", Some(json!({"name": "Ghost"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/hotels/{}", id),
        Some(json!({"rating": -5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("rating"));
    let (_, hotel) = send(&app, "GET", &format!("/hotels/{}", id), None).await;
    assert_eq!(hotel, merged);

    wait_for_search(&app, "/search?q=dallas", &[id.as_str()]).await;
}

#[tokio::test]
async fn test_create_validation_error() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "POST", "/hotels", Some(json!({"city": "Austin"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("name"));
}

// == Search ==

#[tokio::test]
async fn test_search_pagination_is_disjoint() {
    let app = create_test_app().await;
    let mut created = Vec::new();
    for (name, rating) in [("Sheraton A", 5.0), ("Sheraton B", 4.0), ("Sheraton C", 3.0), ("Sheraton D", 2.0), ("Sheraton E", 1.0)] {
        created.push(create_hotel(&app, json!({"name": name, "rating": rating})).await);
    }
    let expected: Vec<&str> = created.iter().map(String::as_str).collect();
    wait_for_search(&app, "/search?q=sheraton&limit=10", &expected).await;

    let (_, first) = send(&app, "GET", "/search?q=sheraton&limit=2&offset=0", None).await;
    let (_, second) = send(&app, "GET", "/search?q=sheraton&limit=2&offset=2", None).await;
    let (_, third) = send(&app, "GET", "/search?q=sheraton&limit=2&offset=4", None).await;

    assert_eq!(ids(&first), &expected[0..2]);
    assert_eq!(ids(&second), &expected[2..4]);
    assert_eq!(ids(&third), &expected[4..5]);
}

#[tokio::test]
async fn test_search_rejects_bad_params() {
    let app = create_test_app().await;

    for uri in [
        "/search?q=x&limit=abc",
        "/search?q=x&offset=-1",
        "/search?limit=0",
        "/search?limit=1000",
    ] {
        let (status, json) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(json.get("error").is_some());
    }
}

// == Users ==

#[tokio::test]
async fn test_user_lifecycle() {
    let app = create_test_app().await;

    let (status, created) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"username": "alice", "password": "digest"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, user) = send(&app, "GET", "/users/username/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], id);
    assert!(user.get("password").is_none());

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"username": "alice", "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/users/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/users/username/alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_user_is_gone_by_username_with_small_local_cache() {
    let app = spawn_app(Config {
        l1_max_entries: 3,
        l1_prune_batch: 1,
        ..Config::default()
    })
    .await;

    let (_, alice) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"username": "alice", "password": "digest"})),
    )
    .await;
    let (status, _) = send(&app, "GET", "/users/username/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    // Pushes alice's id entry out of L1, her username entry stays
    send(
        &app,
        "POST",
        "/users",
        Some(json!({"username": "bob", "password": "digest"})),
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/users/{}", alice["id"]), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/users/username/alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/users/username/bob", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_search_hides_password() {
    let app = create_test_app().await;
    send(
        &app,
        "POST",
        "/users",
        Some(json!({"username": "bob", "password": "digest"})),
    )
    .await;

    let mut found = Value::Null;
    for _ in 0..100 {
        let (_, json) = send(&app, "GET", "/users/search?q=bob", None).await;
        if json.as_array().is_some_and(|docs| !docs.is_empty()) {
            found = json;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(found[0]["username"], "bob");
    assert!(found[0].get("password").is_none());
}

#[tokio::test]
async fn test_user_id_must_be_numeric() {
    let app = create_test_app().await;

    let (status, _) = send(&app, "GET", "/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", "/users/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Refetch Mode ==

#[tokio::test]
async fn test_refetch_mode_indexes_canonical_record() {
    let config = Config {
        event_payload: PayloadMode::Refetch,
        ..Config::default()
    };
    let app = spawn_app(config).await;

    let id = create_hotel(&app, json!({"name": "Westin", "rating": 4.8})).await;
    let results = wait_for_search(&app, "/search?q=westin", &[id.as_str()]).await;
    assert_eq!(results[0]["rating"], 4.8);
}

// == Health Endpoint ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
