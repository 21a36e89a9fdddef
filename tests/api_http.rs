// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use moderation_scorer::api::{self, AppState, CAPABILITY_HEADER};
use moderation_scorer::config::{ConfigHandle, EngineConfig};
use moderation_scorer::{EngineParts, MemoryStore, ModerationEngine};

const BODY_LIMIT: usize = 1024 * 1024;

const SPAM: &str =
    "Buy now!!! Click here now visit our website bit.ly/x bit.ly/y bit.ly/z bit.ly/w";

fn test_router() -> Router {
    let store = Arc::new(MemoryStore::new());
    let engine = ModerationEngine::new(
        ConfigHandle::new(EngineConfig::default_seed().expect("seed")),
        EngineParts::in_memory(store),
    );
    api::router(AppState::new(engine))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse json")
    };
    (status, v)
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router();
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "OK");
}

#[tokio::test]
async fn analyze_returns_contract_fields() {
    let app = test_router();
    let (status, v) = send(
        &app,
        post_json("/analyze", json!({ "content": SPAM, "contentType": "COMMENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {v}");

    assert_eq!(v["isSpam"], json!(true));
    assert_eq!(v["score"], json!(100));
    assert_eq!(v["confidence"], json!(0.95));
    assert_eq!(v["recommendation"], json!("REJECT"));
    assert!(v["reasons"].as_array().is_some_and(|r| !r.is_empty()));
    assert!(v["detectionId"].is_string());
    assert_eq!(v["actions"]["autoRejected"], json!(false));
}

#[tokio::test]
async fn analyze_with_capability_header_auto_rejects() {
    let app = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .header(CAPABILITY_HEADER, "moderate")
        .body(Body::from(
            json!({ "content": SPAM, "autoAct": true }).to_string(),
        ))
        .unwrap();
    let (status, v) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["actions"]["autoRejected"], json!(true));
}

#[tokio::test]
async fn analyze_empty_content_is_400() {
    let app = test_router();
    let (status, v) = send(&app, post_json("/analyze", json!({ "content": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("validation_error"));
    assert!(v["message"].is_string());

    let (status, v) = send(&app, post_json("/analyze", json!({ "text": "wrong field" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("validation_error"));
}

#[tokio::test]
async fn detection_lifecycle_over_http() {
    let app = test_router();
    let (_, v) = send(&app, post_json("/analyze", json!({ "content": SPAM, "scopeId": "ws" }))).await;
    let id = v["detectionId"].as_str().expect("detection id").to_string();

    let (status, rec) = send(&app, get(&format!("/detections/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rec["status"], json!("CONFIRMED"));
    assert_eq!(rec["autoDetected"], json!(true));
    assert_eq!(rec["revision"], json!(1));
    assert_eq!(rec["metadata"]["recommendation"], json!("REJECT"));

    let (status, rec) = send(
        &app,
        post_json(
            &format!("/detections/{id}/review"),
            json!({ "newStatus": "FALSE_POSITIVE", "reviewerId": "mod-1", "notes": "promo from partner" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rec["status"], json!("FALSE_POSITIVE"));
    assert_eq!(rec["reviewedBy"], json!("mod-1"));
    assert_eq!(rec["reviewHistory"].as_array().map(Vec::len), Some(1));
    assert_eq!(rec["reviewHistory"][0]["previousStatus"], json!("CONFIRMED"));

    // stale revision
    let (status, v) = send(
        &app,
        post_json(
            &format!("/detections/{id}/review"),
            json!({ "newStatus": "CONFIRMED", "reviewerId": "mod-2", "expectedRevision": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(v["error"], json!("conflict"));

    let (status, page) = send(&app, get("/detections?scopeId=ws&status=FALSE_POSITIVE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], json!(1));
    assert_eq!(page["records"][0]["id"], json!(id));

    let del = Request::builder()
        .method("DELETE")
        .uri(format!("/detections/{id}?deletedBy=admin"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, del).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, v) = send(&app, get(&format!("/detections/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"], json!("not_found"));
}

#[tokio::test]
async fn list_paginates_newest_first() {
    let app = test_router();
    for _ in 0..5 {
        send(&app, post_json("/analyze", json!({ "content": SPAM }))).await;
    }
    let (status, page) = send(&app, get("/detections?limit=2&offset=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["records"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["pagination"]["total"], json!(5));
    assert_eq!(page["pagination"]["limit"], json!(2));
    assert_eq!(page["pagination"]["offset"], json!(1));
    assert_eq!(page["pagination"]["hasMore"], json!(true));

    let (_, page) = send(&app, get("/detections?limit=1000")).await;
    assert_eq!(page["pagination"]["limit"], json!(100));
    assert_eq!(page["pagination"]["hasMore"], json!(false));
}

#[tokio::test]
async fn bad_status_filter_is_400() {
    let app = test_router();
    let (status, v) = send(&app, get("/detections?status=BOGUS")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("validation_error"));
}

#[tokio::test]
async fn huge_since_days_is_clamped_not_fatal() {
    let app = test_router();
    send(&app, post_json("/analyze", json!({ "content": SPAM }))).await;

    let (status, page) = send(&app, get("/detections?sinceDays=200000000")).await;
    assert_eq!(status, StatusCode::OK, "body: {page}");
    assert_eq!(page["pagination"]["total"], json!(1));

    let (status, v) = send(&app, get("/detections?sinceDays=99999999999")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], json!("validation_error"));
}

#[tokio::test]
async fn repeated_posts_by_one_actor_build_history() {
    let app = test_router();
    let payload = json!({
        "content": "ACT NOW!!!!! visit our website bit.ly/x",
        "actorId": "u1",
        "scopeId": "ws",
    });

    let (status, first) = send(&app, post_json("/analyze", payload.clone())).await;
    assert_eq!(status, StatusCode::OK, "body: {first}");
    assert_eq!(first["historyUsed"], json!(false));

    let mut last = Json::Null;
    for _ in 1..15 {
        let (status, v) = send(&app, post_json("/analyze", payload.clone())).await;
        assert_eq!(status, StatusCode::OK, "body: {v}");
        last = v;
    }

    assert_eq!(last["historyUsed"], json!(true));
    let reasons: Vec<&str> = last["reasons"]
        .as_array()
        .expect("reasons")
        .iter()
        .filter_map(Json::as_str)
        .collect();
    assert!(
        reasons.iter().any(|r| r.starts_with("High posting frequency from new account (14 posts")),
        "{reasons:?}"
    );
    assert!(reasons.contains(&"User has previous violations (14)"), "{reasons:?}");
    assert!(last["score"].as_u64() > first["score"].as_u64());

    // other actors and anonymous posts are unaffected
    let (_, other) = send(
        &app,
        post_json(
            "/analyze",
            json!({ "content": "ACT NOW!!!!! visit our website bit.ly/x", "actorId": "u2", "scopeId": "ws" }),
        ),
    )
    .await;
    assert_eq!(other["historyUsed"], json!(false));
    assert_eq!(other["score"], first["score"]);
}

#[tokio::test]
async fn statistics_endpoint_reports_window() {
    let app = test_router();
    send(&app, post_json("/analyze", json!({ "content": SPAM }))).await;
    send(&app, post_json("/analyze", json!({ "content": "See you at lunch tomorrow." }))).await;

    let (status, s) = send(&app, get("/statistics?windowDays=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(s["windowDays"], json!(3));
    assert_eq!(s["totalDetections"], json!(2));
    assert_eq!(s["confirmedSpam"], json!(1));
    assert_eq!(s["falsePositives"], json!(1));
    assert_eq!(s["accuracy"], json!(100.0));
    assert_eq!(s["dailyTrend"].as_array().map(Vec::len), Some(4));
}
