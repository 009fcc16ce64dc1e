mod common;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode},
};
use shop_backoffice_api::routes::{app, health::health_check};
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check(State(common::offline_state())).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[tokio::test]
async fn unknown_path_gets_json_404() {
    let response = app(common::offline_state())
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["path"], "/nope");
}
