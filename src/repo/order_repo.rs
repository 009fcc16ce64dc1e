use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, LockType},
};

use super::now;
use crate::{
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as ItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel, Column, Entity as Orders, Model, OrderStatus, PaymentStatus},
    },
    error::{AppError, AppResult},
    routes::params::SortOrder,
};

#[derive(Debug, Default)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub is_guest: Option<bool>,
    pub sort_order: Option<SortOrder>,
}

pub async fn create<C: ConnectionTrait>(conn: &C, active: ActiveModel) -> AppResult<Model> {
    Ok(active.insert(conn).await?)
}

pub async fn create_item<C: ConnectionTrait>(
    conn: &C,
    active: OrderItemActive,
) -> AppResult<OrderItemModel> {
    Ok(active.insert(conn).await?)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Orders::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

pub async fn get_by_number<C: ConnectionTrait>(conn: &C, order_number: &str) -> AppResult<Model> {
    Orders::find()
        .filter(Column::OrderNumber.eq(order_number))
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

pub async fn number_exists<C: ConnectionTrait>(conn: &C, order_number: &str) -> AppResult<bool> {
    Ok(Orders::find()
        .filter(Column::OrderNumber.eq(order_number))
        .count(conn)
        .await?
        > 0)
}

pub async fn items_for<C: ConnectionTrait>(
    conn: &C,
    order_id: i64,
) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(ItemCol::OrderId.eq(order_id))
        .order_by_asc(ItemCol::Id)
        .all(conn)
        .await?)
}

/// Items for several orders at once, keyed by order id.
pub async fn items_for_orders<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<OrderItemModel>>> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let items = OrderItems::find()
        .filter(ItemCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(ItemCol::Id)
        .all(conn)
        .await?;

    let mut grouped: HashMap<i64, Vec<OrderItemModel>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

pub async fn update<C: ConnectionTrait>(conn: &C, mut active: ActiveModel) -> AppResult<Model> {
    active.updated_at = Set(now());
    Ok(active.update(conn).await?)
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &OrderFilter,
    offset: i64,
    limit: i64,
) -> AppResult<(Vec<Model>, i64)> {
    let mut condition = Condition::all().add(Column::DeletedAt.is_null());
    if let Some(user_id) = filter.user_id {
        condition = condition.add(Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(Column::Status.eq(status));
    }
    if let Some(payment_status) = filter.payment_status {
        condition = condition.add(Column::PaymentStatus.eq(payment_status));
    }
    if let Some(is_guest) = filter.is_guest {
        condition = condition.add(Column::IsGuestOrder.eq(is_guest));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match filter.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(Column::CreatedAt).order_by_asc(Column::Id),
        SortOrder::Desc => finder.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id),
    };

    let total = finder.clone().count(conn).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?;

    Ok((items, total))
}

/// Guest orders whose contact email or phone equals `email_or_phone`, newest first.
pub async fn find_guest_orders<C: ConnectionTrait>(
    conn: &C,
    email_or_phone: &str,
) -> AppResult<Vec<Model>> {
    Ok(Orders::find()
        .filter(Column::IsGuestOrder.eq(true))
        .filter(Column::DeletedAt.is_null())
        .filter(
            Condition::any()
                .add(Column::CustomerEmail.eq(email_or_phone.to_lowercase()))
                .add(Column::CustomerPhone.eq(email_or_phone)),
        )
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(conn)
        .await?)
}

pub async fn count<C: ConnectionTrait>(conn: &C, is_guest: Option<bool>) -> AppResult<i64> {
    let mut finder = Orders::find().filter(Column::DeletedAt.is_null());
    if let Some(is_guest) = is_guest {
        finder = finder.filter(Column::IsGuestOrder.eq(is_guest));
    }
    Ok(finder.count(conn).await? as i64)
}

pub async fn count_by_status<C: ConnectionTrait>(
    conn: &C,
    is_guest: Option<bool>,
) -> AppResult<Vec<(OrderStatus, i64)>> {
    let mut select = Orders::find()
        .select_only()
        .column(Column::Status)
        .column_as(Expr::col(Column::Id).count(), "count")
        .filter(Column::DeletedAt.is_null());
    if let Some(is_guest) = is_guest {
        select = select.filter(Column::IsGuestOrder.eq(is_guest));
    }
    Ok(select
        .group_by(Column::Status)
        .into_tuple()
        .all(conn)
        .await?)
}

pub async fn count_by_payment_status<C: ConnectionTrait>(
    conn: &C,
) -> AppResult<Vec<(PaymentStatus, i64)>> {
    Ok(Orders::find()
        .select_only()
        .column(Column::PaymentStatus)
        .column_as(Expr::col(Column::Id).count(), "count")
        .filter(Column::DeletedAt.is_null())
        .group_by(Column::PaymentStatus)
        .into_tuple()
        .all(conn)
        .await?)
}

/// Sum of `final_amount` over paid orders.
pub async fn paid_revenue<C: ConnectionTrait>(
    conn: &C,
    is_guest: Option<bool>,
) -> AppResult<Decimal> {
    let mut select = Orders::find()
        .select_only()
        .column_as(Expr::col(Column::FinalAmount).sum(), "revenue")
        .filter(Column::DeletedAt.is_null())
        .filter(Column::PaymentStatus.eq(PaymentStatus::Paid));
    if let Some(is_guest) = is_guest {
        select = select.filter(Column::IsGuestOrder.eq(is_guest));
    }
    let revenue: Option<Option<Decimal>> = select.into_tuple().one(conn).await?;
    Ok(revenue.flatten().unwrap_or(Decimal::ZERO))
}

/// Row-locked read for status changes inside a transaction.
pub async fn get_for_update<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Orders::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

pub async fn soft_delete<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<()> {
    let result = Orders::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Order"));
    }
    Ok(())
}
