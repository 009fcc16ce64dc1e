mod common;

use rust_decimal::dec;
use shop_backoffice_api::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        categories::CategoryRequest,
        orders::{UpdateOrderStatusRequest, UpdatePaymentStatusRequest},
        products::SetStockRequest,
        users::UpdateRoleRequest,
    },
    entity::{
        orders::{OrderStatus, PaymentStatus},
        users::Role,
    },
    error::AppError,
    repo::product_repo,
    services::{
        admin_service, auth_service, category_service, order_service, product_service,
        user_service,
    },
};

#[tokio::test]
async fn order_status_follows_the_state_machine() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let product = common::seed_product(&state, dec!(20), 5).await?;
    let placed = order_service::place_order(
        &state,
        None,
        common::order_request(&[(product.id, 1)]),
    )
    .await?
    .data
    .expect("order data");
    let id = placed.order.id;

    let set = |status| UpdateOrderStatusRequest { status };

    admin_service::update_order_status(&state, &admin, id, set(OrderStatus::Processing)).await?;
    let shipped = admin_service::update_order_status(&state, &admin, id, set(OrderStatus::Shipped))
        .await?
        .data
        .expect("order");
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.shipped_at.is_some());
    assert!(shipped.delivered_at.is_none());

    for illegal in [OrderStatus::Pending, OrderStatus::Cancelled] {
        let err = admin_service::update_order_status(&state, &admin, id, set(illegal))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "unexpected error: {err:?}");
    }

    let delivered =
        admin_service::update_order_status(&state, &admin, id, set(OrderStatus::Delivered))
            .await?
            .data
            .expect("order");
    assert!(delivered.delivered_at.is_some());

    let paid = admin_service::update_payment_status(
        &state,
        &admin,
        id,
        UpdatePaymentStatusRequest {
            payment_status: PaymentStatus::Paid,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let err = admin_service::update_payment_status(
        &state,
        &admin,
        id,
        UpdatePaymentStatusRequest {
            payment_status: PaymentStatus::Failed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn regular_users_cannot_manage_orders() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let user = common::seed_user(&state, Role::User).await?;
    let err = admin_service::order_stats(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn stats_count_guest_orders_and_paid_revenue() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let product = common::seed_product(&state, dec!(7.25), 5).await?;

    let before = admin_service::order_stats(&state, &admin)
        .await?
        .data
        .expect("stats");
    let placed = order_service::place_order(
        &state,
        None,
        common::order_request(&[(product.id, 2)]),
    )
    .await?
    .data
    .expect("order data");
    admin_service::update_payment_status(
        &state,
        &admin,
        placed.order.id,
        UpdatePaymentStatusRequest {
            payment_status: PaymentStatus::Paid,
        },
    )
    .await?;
    let after = admin_service::order_stats(&state, &admin)
        .await?
        .data
        .expect("stats");

    assert!(after.total_orders > before.total_orders);
    assert!(after.guest_orders > before.guest_orders);
    assert_eq!(
        after.registered_orders,
        after.total_orders - after.guest_orders
    );
    assert!(after.paid_revenue >= before.paid_revenue + dec!(14.50));
    Ok(())
}

#[tokio::test]
async fn stale_stock_write_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let product = common::seed_product(&state, dec!(15), 8).await?;

    let updated = product_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            stock: 12,
            expected_stock: 8,
        },
    )
    .await?
    .data
    .expect("stock update");
    assert_eq!((updated.old_stock, updated.new_stock), (8, 12));

    let err = product_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            stock: 3,
            expected_stock: 8,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "unexpected error: {err:?}");
    assert_eq!(product_repo::get_by_id(&state.orm, product.id).await?.stock, 12);
    Ok(())
}

#[tokio::test]
async fn admins_manage_other_accounts_only() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let target = common::seed_user(&state, Role::User).await?;
    let owner = common::seed_user(&state, Role::Owner).await?;

    let promoted = user_service::update_role(
        &state,
        &admin,
        target.user_id,
        UpdateRoleRequest { role: Role::Admin },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(promoted.role, Role::Admin);

    let toggled = user_service::toggle_status(&state, &admin, target.user_id)
        .await?
        .data
        .expect("user");
    assert!(!toggled.is_active);

    assert!(matches!(
        user_service::toggle_status(&state, &admin, admin.user_id).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        user_service::delete_user(&state, &admin, owner.user_id).await,
        Err(AppError::Forbidden)
    ));

    user_service::delete_user(&state, &owner, target.user_id).await?;
    assert!(matches!(
        user_service::get_user(&state, &admin, target.user_id).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn register_then_login_issues_a_verifiable_token() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let username = common::unique("shopper");
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password: "secret123".into(),
            full_name: Some("Shopper".into()),
            phone: None,
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(registered.role, Role::User);

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            username: username.clone(),
            email: format!("other-{username}@example.com"),
            password: "secret123".into(),
            full_name: None,
            phone: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            login: format!("{username}@example.com"),
            password: "secret123".into(),
        },
    )
    .await?
    .data
    .expect("login");
    let claims = state.jwt.verify(&login.token)?;
    assert_eq!(claims.user_id, registered.id);
    assert_eq!(claims.role, Role::User);

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            login: username,
            password: "not-it".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    Ok(())
}

#[tokio::test]
async fn category_slugs_are_unique() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let admin = common::seed_user(&state, Role::Admin).await?;
    let name = common::unique("Silk Scarves ");

    let created = category_service::create_category(
        &state,
        &admin,
        CategoryRequest {
            name: name.clone(),
            description: None,
            slug: None,
            is_active: None,
        },
    )
    .await?
    .data
    .expect("category");
    assert!(created.is_active);
    assert!(!created.slug.contains(' '));

    let fetched = category_service::get_category_by_slug(&state, &created.slug)
        .await?
        .data
        .expect("category");
    assert_eq!(fetched.id, created.id);

    let duplicate = category_service::create_category(
        &state,
        &admin,
        CategoryRequest {
            name,
            description: None,
            slug: None,
            is_active: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    Ok(())
}
