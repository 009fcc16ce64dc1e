mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use shop_backoffice_api::{
    dto::users::UpdateRoleRequest,
    entity::users::Role,
    middleware::auth::{AuthUser, JwtKeys},
    routes::app,
    services::user_service,
    state::AppState,
};
use tower::ServiceExt;

fn bearer(state: &AppState, user: &AuthUser) -> String {
    let token = state
        .jwt
        .issue(user.user_id, &user.username, user.role)
        .unwrap();
    format!("Bearer {token}")
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or_default())
}

#[tokio::test]
async fn my_orders_requires_a_token() {
    let (status, body) = send(common::offline_state(), get("/api/orders/my", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() {
    let (status, _) = send(
        common::offline_state(),
        get("/api/orders/my", Some("Basic dXNlcjpwYXNz")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let (status, _) = send(common::offline_state(), get("/api/admin/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected_on_order_creation() {
    let forged = JwtKeys::new("other-secret", 1)
        .issue(1, "mallory", Role::Admin)
        .unwrap();
    let (status, _) = send(
        common::offline_state(),
        Request::post("/api/orders")
            .header(header::AUTHORIZATION, format!("Bearer {forged}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_order_payload_is_rejected_before_storage() {
    let (status, _) = send(
        common::offline_state(),
        Request::post("/api/public/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{
                    "payment_method": "cod",
                    "shipping_address": "   ",
                    "customer_name": "Guest",
                    "customer_phone": "0901234567",
                    "customer_email": "guest@example.com",
                    "items": [{"product_id": 1, "quantity": 1}]
                }"#,
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn regular_users_cannot_reach_admin_routes() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let user = common::seed_user(&state, Role::User).await?;
    let authorization = bearer(&state, &user);

    for uri in ["/api/admin/orders", "/api/admin/users", "/api/admin/coupons"] {
        let (status, _) = send(state.clone(), get(uri, Some(&authorization))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn admins_pass_the_gate() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let target = common::seed_user(&state, Role::User).await?;

    // Promoting to owner is refused by the handler, past both gates.
    let (status, body) = send(
        state.clone(),
        Request::put(format!("/api/admin/users/{}/role", target.user_id))
            .header(header::AUTHORIZATION, bearer(&state, &admin))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"role":"owner"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn deleted_admin_loses_access_immediately() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let owner = common::seed_user(&state, Role::Owner).await?;
    let admin = common::seed_user(&state, Role::Admin).await?;
    let authorization = bearer(&state, &admin);

    let (status, _) = send(state.clone(), get("/api/admin/orders", Some(&authorization))).await;
    assert_eq!(status, StatusCode::OK);

    user_service::delete_user(&state, &owner, admin.user_id).await?;

    let (status, body) = send(state.clone(), get("/api/admin/orders", Some(&authorization))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn demoted_admin_is_forbidden() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let owner = common::seed_user(&state, Role::Owner).await?;
    let admin = common::seed_user(&state, Role::Admin).await?;
    let authorization = bearer(&state, &admin);

    user_service::update_role(
        &state,
        &owner,
        admin.user_id,
        UpdateRoleRequest { role: Role::User },
    )
    .await?;

    let (status, _) = send(state.clone(), get("/api/admin/orders", Some(&authorization))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn disabled_account_token_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let user = common::seed_user(&state, Role::User).await?;
    let authorization = bearer(&state, &user);

    let (status, _) = send(state.clone(), get("/api/orders/my", Some(&authorization))).await;
    assert_eq!(status, StatusCode::OK);

    user_service::toggle_status(&state, &admin, user.user_id).await?;

    let (status, _) = send(state.clone(), get("/api/orders/my", Some(&authorization))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
