//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle against real cache instances.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use flupsy_cache::{
    api::create_router,
    cache::ManualClock,
    caches::{basket_detail_key, baskets_key, PositionHistory, BASKETS, OPERATIONS},
    AppCaches, AppState, Config,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (AppCaches, Arc<ManualClock>, Router) {
    let clock = Arc::new(ManualClock::new(1_000));
    let caches = AppCaches::with_clock(&Config::default(), clock.clone());
    let app = create_router(AppState::from_caches(&caches));
    (caches, clock, app)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Health and Listing ==

#[tokio::test]
async fn test_health_endpoint() {
    let (_caches, _clock, app) = create_test_app();

    let (status, json) = send(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["caches"], 7);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_list_caches_in_registration_order() {
    let (_caches, _clock, app) = create_test_app();

    let (status, json) = send(app, "GET", "/caches", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["caches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "operations",
            "baskets",
            "positions",
            "lot_statistics",
            "dashboard",
            "ai_query",
            "responses"
        ]
    );
}

// == Stats ==

#[tokio::test]
async fn test_stats_counts_expired_entries_without_evicting() {
    let (caches, clock, app) = create_test_app();
    caches
        .operations
        .set("fresh".to_string(), json!([1]), Some(Duration::from_secs(600)));
    caches
        .operations
        .set("stale".to_string(), json!([2]), Some(Duration::from_secs(1)));
    clock.advance(5_000);

    let (status, json) = send(app, "GET", "/caches/operations/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_entries"], 2);
    assert_eq!(json["valid_entries"], 1);
    assert_eq!(json["expired_entries"], 1);
    assert!(json["approx_size_bytes"].as_u64().unwrap() > 0);
    assert_eq!(caches.operations.len(), 2);
}

#[tokio::test]
async fn test_reset_stats_zeroes_counters() {
    let (caches, _clock, app) = create_test_app();
    caches.dashboard.set("dashboard_all".to_string(), json!({}), None);
    caches.dashboard.get(&"dashboard_all".to_string());
    caches.dashboard.get(&"missing".to_string());

    let (status, json) = send(app.clone(), "POST", "/caches/dashboard/stats/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 0);
    assert_eq!(json["misses"], 0);
    assert_eq!(json["total_entries"], 1);

    let (status, _) = send(app, "POST", "/caches/sessions/stats/reset", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_unknown_cache() {
    let (_caches, _clock, app) = create_test_app();

    let (status, json) = send(app, "GET", "/caches/sessions/stats", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("sessions"));
}

// == Keys ==

#[tokio::test]
async fn test_keys_endpoint_sorted() {
    let (caches, _clock, app) = create_test_app();
    caches.baskets.set(basket_detail_key(2), json!({}), None);
    caches.baskets.set(basket_detail_key(1), json!({}), None);

    let (status, json) = send(app, "GET", "/caches/baskets/keys", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cache"], BASKETS);
    assert_eq!(json["keys"], json!(["basket:1", "basket:2"]));
}

// == Manual Invalidation ==

#[tokio::test]
async fn test_delete_key() {
    let (caches, _clock, app) = create_test_app();
    caches.positions.set(
        5,
        PositionHistory {
            basket_exists: true,
            positions: vec![json!({"row": 1})],
        },
        None,
    );

    let (status, json) = send(app.clone(), "DELETE", "/caches/positions/keys/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);
    assert!(caches.positions.get(&5).is_none());

    // Idempotent
    let (status, json) = send(app, "DELETE", "/caches/positions/keys/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 0);
}

#[tokio::test]
async fn test_delete_prefix_leaves_other_keys() {
    let (caches, _clock, app) = create_test_app();
    let list_key = baskets_key([("flupsyId", "3")]);
    caches.baskets.set(list_key.clone(), json!([]), None);
    caches.baskets.set(basket_detail_key(9), json!({}), None);

    let (status, json) = send(app, "DELETE", "/caches/baskets/prefix/baskets_", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);
    assert!(caches.baskets.get(&list_key).is_none());
    assert!(caches.baskets.get(&basket_detail_key(9)).is_some());
}

#[tokio::test]
async fn test_clear_cache() {
    let (caches, _clock, app) = create_test_app();
    caches.dashboard.set("a".to_string(), json!(1), None);
    caches.dashboard.set("b".to_string(), json!(2), None);

    let (status, json) = send(app, "DELETE", "/caches/dashboard", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert!(caches.dashboard.is_empty());
}

#[tokio::test]
async fn test_invalidate_with_body() {
    let (caches, _clock, app) = create_test_app();
    caches.operations.set("operations_all".to_string(), json!([]), None);
    caches.operations.set("operations_cycleId_4".to_string(), json!([]), None);

    let (status, json) = send(
        app,
        "POST",
        "/caches/operations/invalidate",
        Some(r#"{"scope":"key","value":"operations_all"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cache"], OPERATIONS);
    assert_eq!(json["removed"], 1);
    assert_eq!(caches.operations.len(), 1);
}

#[tokio::test]
async fn test_invalidate_rejects_empty_prefix() {
    let (caches, _clock, app) = create_test_app();
    caches.operations.set("operations_all".to_string(), json!([]), None);

    let (status, json) = send(
        app,
        "POST",
        "/caches/operations/invalidate",
        Some(r#"{"scope":"prefix","value":""}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
    assert_eq!(caches.operations.len(), 1);
}

// == Mutation Events ==

#[tokio::test]
async fn test_operation_event_invalidates_dependent_caches() {
    let (caches, _clock, app) = create_test_app();
    caches.operations.set("operations_all".to_string(), json!([]), None);
    caches.dashboard.set("dashboard_all".to_string(), json!({}), None);
    caches.baskets.set(baskets_key([("state", "active")]), json!([]), None);
    caches.baskets.set(basket_detail_key(3), json!({}), None);
    caches.baskets.set(basket_detail_key(4), json!({}), None);
    caches.positions.set(
        4,
        PositionHistory {
            basket_exists: true,
            positions: vec![],
        },
        None,
    );

    let (status, json) = send(
        app,
        "POST",
        "/events",
        Some(r#"{"entity":"operation","action":"created","basket_id":3}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entity"], "operation");
    assert!(!json["invalidated"].as_array().unwrap().is_empty());

    assert!(caches.operations.is_empty());
    assert!(caches.dashboard.is_empty());
    assert_eq!(caches.baskets.keys(), vec![basket_detail_key(4)]);
    // Not tied to operations
    assert_eq!(caches.positions.len(), 1);
}

#[tokio::test]
async fn test_event_with_unknown_entity_rejected() {
    let (_caches, _clock, app) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"entity":"tank","action":"created"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Expiry Through the API ==

#[tokio::test]
async fn test_expired_entry_is_a_miss_after_ttl() {
    let (caches, clock, app) = create_test_app();
    caches.dashboard.set("dashboard_all".to_string(), json!({"kpi": 1}), None);

    // Dashboard default TTL is 30 s
    clock.advance(29_999);
    assert!(caches.dashboard.get(&"dashboard_all".to_string()).is_some());
    clock.advance(1);
    assert!(caches.dashboard.get(&"dashboard_all".to_string()).is_none());

    let (_, json) = send(app, "GET", "/caches/dashboard/stats", None).await;
    assert_eq!(json["total_entries"], 0);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
}

// == Response Cache ==

#[tokio::test]
async fn test_cached_route_is_invalidated_by_mutation_event() {
    let (caches, _clock, admin) = create_test_app();
    let api = caches.responses.wrap(
        Router::new().route("/api/operations", get(|| async { Json(json!([])) })),
    );
    let get_operations = || {
        Request::builder()
            .uri("/api/operations?flupsyId=2")
            .body(Body::empty())
            .unwrap()
    };

    let miss = api.clone().oneshot(get_operations()).await.unwrap();
    assert_eq!(miss.headers()["x-cache"], "MISS");
    let hit = api.clone().oneshot(get_operations()).await.unwrap();
    assert_eq!(hit.headers()["x-cache"], "HIT");

    let (status, _) = send(
        admin,
        "POST",
        "/events",
        Some(r#"{"entity":"operation","action":"created"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = api.oneshot(get_operations()).await.unwrap();
    assert_eq!(after.headers()["x-cache"], "MISS");
}
