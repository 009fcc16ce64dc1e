use sea_orm::{IntoActiveModel, Set, TransactionTrait};

use crate::{
    audit,
    dto::orders::{
        GuestOrderStats, OrderList, OrderStats, OrderWithItems, PaymentStatusCount, StatusCount,
        UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
    },
    entity::orders::OrderStatus,
    error::AppResult,
    middleware::auth::{AuthUser, Permission, ensure_permission},
    models::Order,
    repo::{
        now,
        order_repo::{self, OrderFilter},
    },
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        order_service::{to_response, with_items},
        order_state::{ensure_payment_transition, ensure_status_transition},
    },
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: None,
        status: query.status,
        payment_status: query.payment_status,
        is_guest: query.is_guest,
        sort_order: query.sort_order,
    };

    let (orders, total) = order_repo::list(&state.orm, &filter, offset, limit).await?;
    let items = with_items(&state.orm, orders).await?;

    Ok(ApiResponse::paginated(
        "Orders",
        OrderList { items },
        Meta::new(page, limit, total),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let order = order_repo::get_by_id(&state.orm, id).await?;
    let items = order_repo::items_for(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order found", to_response(order, items)))
}

pub async fn order_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderStats>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let total_orders = order_repo::count(&state.orm, None).await?;
    let guest_orders = order_repo::count(&state.orm, Some(true)).await?;
    let by_status = order_repo::count_by_status(&state.orm, None)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let by_payment_status = order_repo::count_by_payment_status(&state.orm)
        .await?
        .into_iter()
        .map(|(payment_status, count)| PaymentStatusCount {
            payment_status,
            count,
        })
        .collect();
    let paid_revenue = order_repo::paid_revenue(&state.orm, None).await?;

    Ok(ApiResponse::success(
        "Order stats",
        OrderStats {
            total_orders,
            guest_orders,
            registered_orders: total_orders - guest_orders,
            by_status,
            by_payment_status,
            paid_revenue,
        },
    ))
}

pub async fn guest_order_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<GuestOrderStats>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let total_guest_orders = order_repo::count(&state.orm, Some(true)).await?;
    let by_status = order_repo::count_by_status(&state.orm, Some(true))
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let paid_revenue = order_repo::paid_revenue(&state.orm, Some(true)).await?;

    Ok(ApiResponse::success(
        "Guest order stats",
        GuestOrderStats {
            total_guest_orders,
            by_status,
            paid_revenue,
        },
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let txn = state.orm.begin().await?;
    let existing = order_repo::get_for_update(&txn, id).await?;
    let from = existing.status;
    ensure_status_transition(from, payload.status)?;

    let mut active = existing.into_active_model();
    active.status = Set(payload.status);
    match payload.status {
        OrderStatus::Shipped => active.shipped_at = Set(Some(now())),
        OrderStatus::Delivered => active.delivered_at = Set(Some(now())),
        _ => {}
    }
    let order = order_repo::update(&txn, active).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = id,
        from = from.as_str(),
        to = payload.status.as_str(),
        "order status changed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": from, "to": payload.status }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", order.into()))
}

pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_permission(user, Permission::ManageOrders)?;
    let txn = state.orm.begin().await?;
    let existing = order_repo::get_for_update(&txn, id).await?;
    let from = existing.payment_status;
    ensure_payment_transition(from, payload.payment_status)?;

    let mut active = existing.into_active_model();
    active.payment_status = Set(payload.payment_status);
    let order = order_repo::update(&txn, active).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = id,
        from = from.as_str(),
        to = payload.payment_status.as_str(),
        "payment status changed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_payment_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": from, "to": payload.payment_status }),
    )
    .await;

    Ok(ApiResponse::success("Payment status updated", order.into()))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_permission(user, Permission::ManageOrders)?;
    order_repo::soft_delete(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order deleted", serde_json::json!({ "id": id })))
}
