use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use super::now;
use crate::{
    entity::coupons::{ActiveModel, Column, Entity as Coupons, Model},
    error::{AppError, AppResult},
};

pub async fn create<C: ConnectionTrait>(conn: &C, active: ActiveModel) -> AppResult<Model> {
    Ok(active.insert(conn).await?)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Coupons::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Coupon"))
}

pub async fn get_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Model> {
    Coupons::find()
        .filter(Column::Code.eq(code))
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Coupon"))
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    offset: i64,
    limit: i64,
) -> AppResult<(Vec<Model>, i64)> {
    let finder = Coupons::find()
        .filter(Column::DeletedAt.is_null())
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(conn).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?;
    Ok((items, total))
}

pub async fn update<C: ConnectionTrait>(conn: &C, mut active: ActiveModel) -> AppResult<Model> {
    active.updated_at = Set(now());
    Ok(active.update(conn).await?)
}

pub async fn soft_delete<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<()> {
    let result = Coupons::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Coupon"));
    }
    Ok(())
}

pub async fn code_exists<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut finder = Coupons::find().filter(Column::Code.eq(code));
    if let Some(id) = exclude_id {
        finder = finder.filter(Column::Id.ne(id));
    }
    Ok(finder.count(conn).await? > 0)
}

/// Consume one use of the coupon while it is still under its usage limit.
pub async fn redeem<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<bool> {
    let result = Coupons::update_many()
        .col_expr(Column::UsedCount, Expr::col(Column::UsedCount).add(1))
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(
            Condition::any()
                .add(Column::UsageLimit.eq(0))
                .add(Expr::col(Column::UsedCount).lt(Expr::col(Column::UsageLimit))),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}
