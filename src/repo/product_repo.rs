use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};

use super::now;
use crate::{
    entity::products::{ActiveModel, Column, Entity as Products, Model},
    error::{AppError, AppResult},
    routes::params::{ProductSortBy, SortOrder},
};

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub active_only: bool,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

pub async fn create<C: ConnectionTrait>(conn: &C, active: ActiveModel) -> AppResult<Model> {
    Ok(active.insert(conn).await?)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Products::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

pub async fn get_by_sku<C: ConnectionTrait>(conn: &C, sku: &str) -> AppResult<Model> {
    Products::find()
        .filter(Column::Sku.eq(sku))
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

/// Returns one page of products plus the total number of matches.
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &ProductFilter,
    offset: i64,
    limit: i64,
) -> AppResult<(Vec<Model>, i64)> {
    let mut condition = Condition::all().add(Column::DeletedAt.is_null());
    if filter.active_only {
        condition = condition.add(Column::IsActive.eq(true));
    }
    if let Some(category_id) = filter.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(search) = filter.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Sku).ilike(pattern)),
        );
    }

    let sort_col = match filter.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match filter.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    finder = finder.order_by_asc(Column::Id);

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
    let result = Products::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }
    Ok(())
}

pub async fn sku_exists<C: ConnectionTrait>(
    conn: &C,
    sku: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut finder = Products::find().filter(Column::Sku.eq(sku));
    if let Some(id) = exclude_id {
        finder = finder.filter(Column::Id.ne(id));
    }
    Ok(finder.count(conn).await? > 0)
}

/// `UPDATE products SET stock = stock - qty WHERE id = ? AND stock >= qty`.
///
/// Returns `false` when the guard did not match, which under concurrent
/// checkouts means another order took the remaining stock first.
pub async fn decrement_stock<C: ConnectionTrait>(conn: &C, id: i64, qty: i32) -> AppResult<bool> {
    let result = Products::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).sub(qty))
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::Stock.gte(qty))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Overwrite stock only if it still equals `expected`.
pub async fn set_stock<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    expected: i32,
    new_stock: i32,
) -> AppResult<bool> {
    let result = Products::update_many()
        .col_expr(Column::Stock, Expr::value(new_stock))
        .col_expr(Column::UpdatedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::Stock.eq(expected))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}
