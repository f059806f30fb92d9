mod common;

use std::net::SocketAddr;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use exporium_api::{domain::SessionMode, middleware::TRACKING_BURST, routes::build_router};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let app = build_router(common::offline_state()).expect("router");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_served_without_a_database() {
    let (status, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn unknown_routes_answer_with_the_envelope() {
    let (status, body) = send(get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nope");
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let (status, body) = send(get("/api/orders/my")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");

    let request = Request::builder()
        .uri("/api/admin/orders")
        .header(header::AUTHORIZATION, "Basic abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let request = Request::builder()
        .uri("/api/orders/my")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signed with a different secret.
    let other = exporium_api::session::SessionKeys::new(
        "some-other-secret-0123456789abcdef",
        chrono::Duration::hours(1),
    );
    let token = other.issue(Uuid::new_v4(), SessionMode::Admin).unwrap();
    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhooks_without_a_signature_are_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payment-confirmed")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"type":"checkout.session.completed"}"#))
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["error"], "Bad Request: Missing signature");
}

#[tokio::test]
async fn webhooks_with_a_bad_signature_are_rejected() {
    let now = chrono::Utc::now().timestamp();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("stripe-signature", format!("t={now},v1=deadbeef"))
        .body(Body::from(r#"{"type":"checkout.session.completed"}"#))
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhooks_with_an_absurd_timestamp_are_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payment-confirmed")
        .header("stripe-signature", "t=-9223372036854775808,v1=00")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn tracking_lookup(forwarded_for: &str) -> Request<Body> {
    let mut request = Request::builder()
        .uri("/api/tracking/short")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 5000))));
    request
}

async fn statuses(app: &Router, count: u32) -> Vec<StatusCode> {
    let mut seen = Vec::new();
    for n in 0..count {
        let forwarded = format!("10.0.{}.{}", n / 250, n % 250 + 1);
        let response = app
            .clone()
            .oneshot(tracking_lookup(&forwarded))
            .await
            .expect("response");
        seen.push(response.status());
    }
    seen
}

#[tokio::test]
async fn tracking_lookups_are_throttled_per_peer() {
    let app = build_router(common::offline_state()).expect("router");
    // A fresh X-Forwarded-For on every request must not buy a fresh bucket.
    let seen = statuses(&app, TRACKING_BURST + 10).await;
    assert_eq!(seen[0], StatusCode::NOT_FOUND);
    assert!(seen.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn forwarded_headers_key_the_limit_when_trusted() {
    let mut state = common::offline_state();
    std::sync::Arc::make_mut(&mut state.config).trust_proxy_headers = true;
    let app = build_router(state).expect("router");
    let seen = statuses(&app, TRACKING_BURST + 10).await;
    assert!(seen.iter().all(|status| *status == StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn malformed_tracking_ids_are_not_found() {
    let (status, _) = send(get("/api/tracking/short")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_docs_are_served() {
    let (status, _) = send(get("/docs")).await;
    assert_eq!(status, StatusCode::OK);
}
