use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, ConnectionTrait, Set, TransactionTrait};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::orders::{GuestLookupRequest, OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        coupons::Model as CouponModel,
        order_items::{ActiveModel as OrderItemActive, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Model as OrderModel, OrderStatus, PaymentStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission},
    models::{Order, OrderItem},
    repo::{
        coupon_repo,
        order_repo::{self, OrderFilter},
        product_repo,
    },
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        coupon_service::normalize_code,
        pricing::{OrderTotals, coupon_discount, ensure_coupon_applicable, line_total},
    },
    state::AppState,
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// `ORD-<yyyymmddHHMMSS>-<8 hex>`.
pub fn generate_order_number() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", stamp, &suffix[..8].to_uppercase())
}

async fn unique_order_number<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number();
        if !order_repo::number_exists(conn, &candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(order_number = %candidate, "order number collision");
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique order number"
    )))
}

struct PricedLine {
    product_id: i64,
    product_name: String,
    quantity: i32,
    price: Decimal,
    total: Decimal,
}

pub(crate) fn to_response(order: OrderModel, items: Vec<OrderItemModel>) -> OrderWithItems {
    OrderWithItems {
        order: Order::from(order),
        items: items.into_iter().map(OrderItem::from).collect(),
    }
}

/// Attach items to each order with a single extra query.
pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items = order_repo::items_for_orders(conn, &ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| {
            let order_items = items.remove(&order.id).unwrap_or_default();
            to_response(order, order_items)
        })
        .collect())
}

/// Place an order for a registered caller or, with `caller == None`, a guest.
///
/// Everything from the product reads to the coupon redemption runs in one
/// transaction bounded by the configured order timeout; any failure or an
/// expired deadline drops the transaction and nothing is written.
pub async fn place_order(
    state: &AppState,
    caller: Option<&AuthUser>,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    payload.validate()?;
    let user_id = caller.map(|u| u.user_id);

    let (order, items) = tokio::time::timeout(
        state.config.order_timeout,
        persist_order(state, user_id, &payload),
    )
    .await
    .map_err(|_| {
        tracing::warn!(user_id = ?user_id, "order placement timed out");
        AppError::Timeout
    })??;

    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        user_id = ?order.user_id,
        guest = order.is_guest_order,
        final_amount = %order.final_amount,
        "order placed"
    );
    audit::record(
        &state.orm,
        order.user_id,
        "order_placed",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "order_number": order.order_number,
            "guest": order.is_guest_order,
        }),
    )
    .await;

    Ok(ApiResponse::success("Order created", to_response(order, items)))
}

async fn persist_order(
    state: &AppState,
    user_id: Option<i64>,
    payload: &PlaceOrderRequest,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let txn = state.orm.begin().await?;

    let mut lines = Vec::with_capacity(payload.items.len());
    for (product_id, quantity) in payload.merged_items() {
        let product = match product_repo::get_by_id(&txn, product_id).await {
            Ok(product) if product.is_active => product,
            Ok(_) | Err(AppError::NotFound(_)) => return Err(AppError::NotFound("Product")),
            Err(err) => return Err(err),
        };
        if product.stock < quantity {
            return Err(AppError::OutOfStock { product_id });
        }
        lines.push(PricedLine {
            product_id,
            product_name: product.name,
            quantity,
            price: product.price,
            total: line_total(product.price, quantity),
        });
    }

    let total_amount: Decimal = lines.iter().map(|line| line.total).sum();

    let coupon = match payload
        .coupon_code
        .as_deref()
        .map(normalize_code)
        .filter(|code| !code.is_empty())
    {
        Some(code) => Some(applicable_coupon(&txn, &code, total_amount).await?),
        None => None,
    };
    let discount = coupon
        .as_ref()
        .map(|c| coupon_discount(c, total_amount))
        .unwrap_or(Decimal::ZERO);
    let totals = OrderTotals::compute(total_amount, discount, state.config.shipping_fee);

    let order_number = unique_order_number(&txn).await?;
    let shipping_address = payload.shipping_address.trim().to_string();
    let billing_address = payload
        .billing_address
        .as_deref()
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| shipping_address.clone());

    let order = order_repo::create(
        &txn,
        OrderActive {
            id: NotSet,
            user_id: Set(user_id),
            order_number: Set(order_number),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(payload.payment_method),
            total_amount: Set(totals.total_amount),
            discount_amount: Set(totals.discount_amount),
            shipping_amount: Set(totals.shipping_amount),
            final_amount: Set(totals.final_amount),
            coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
            shipping_address: Set(shipping_address),
            billing_address: Set(billing_address),
            customer_name: Set(payload.customer_name.trim().to_string()),
            customer_phone: Set(payload.customer_phone.trim().to_string()),
            customer_email: Set(payload.customer_email.trim().to_lowercase()),
            notes: Set(payload.notes.clone()),
            is_guest_order: Set(user_id.is_none()),
            shipped_at: Set(None),
            delivered_at: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;

    // Lines are ordered by product id, so concurrent orders lock product rows in the same order.
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if !product_repo::decrement_stock(&txn, line.product_id, line.quantity).await? {
            return Err(AppError::OutOfStock {
                product_id: line.product_id,
            });
        }
        let item = order_repo::create_item(
            &txn,
            OrderItemActive {
                id: NotSet,
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                product_name: Set(line.product_name),
                quantity: Set(line.quantity),
                price: Set(line.price),
                total: Set(line.total),
                created_at: NotSet,
            },
        )
        .await?;
        items.push(item);
    }

    if let Some(coupon) = &coupon {
        if !coupon_repo::redeem(&txn, coupon.id).await? {
            return Err(AppError::validation("Coupon usage limit reached"));
        }
    }

    txn.commit().await?;
    Ok((order, items))
}

async fn applicable_coupon<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    total_amount: Decimal,
) -> AppResult<CouponModel> {
    let coupon = match coupon_repo::get_by_code(conn, code).await {
        Ok(coupon) => coupon,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::validation(format!("Invalid coupon code '{code}'")));
        }
        Err(err) => return Err(err),
    };
    ensure_coupon_applicable(&coupon, total_amount, Utc::now())?;
    Ok(coupon)
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: query.status,
        payment_status: query.payment_status,
        is_guest: None,
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

/// Visible to the owning user and to order managers; anyone else gets NotFound.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = order_repo::get_by_id(&state.orm, id).await?;
    if order.user_id != Some(user.user_id) && !user.can(Permission::ManageOrders) {
        return Err(AppError::NotFound("Order"));
    }
    let items = order_repo::items_for(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order", to_response(order, items)))
}

pub async fn track_order(
    state: &AppState,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = order_repo::get_by_number(&state.orm, order_number.trim()).await?;
    let items = order_repo::items_for(&state.orm, order.id).await?;
    Ok(ApiResponse::success("Order", to_response(order, items)))
}

/// Guest orders placed with the given email or phone, newest first.
pub async fn lookup_guest_orders(
    state: &AppState,
    payload: GuestLookupRequest,
) -> AppResult<ApiResponse<OrderList>> {
    payload.validate()?;
    let orders = order_repo::find_guest_orders(&state.orm, payload.email_or_phone.trim()).await?;
    let items = with_items(&state.orm, orders).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }))
}
