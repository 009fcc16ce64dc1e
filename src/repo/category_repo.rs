use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};

use super::now;
use crate::{
    entity::categories::{ActiveModel, Column, Entity as Categories, Model},
    error::{AppError, AppResult},
};

pub async fn create<C: ConnectionTrait>(conn: &C, active: ActiveModel) -> AppResult<Model> {
    Ok(active.insert(conn).await?)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Categories::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Category"))
}

pub async fn get_by_slug<C: ConnectionTrait>(conn: &C, slug: &str) -> AppResult<Model> {
    Categories::find()
        .filter(Column::Slug.eq(slug))
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Category"))
}

pub async fn list<C: ConnectionTrait>(conn: &C, active_only: bool) -> AppResult<Vec<Model>> {
    let mut finder = Categories::find().filter(Column::DeletedAt.is_null());
    if active_only {
        finder = finder.filter(Column::IsActive.eq(true));
    }
    Ok(finder.order_by_asc(Column::Name).all(conn).await?)
}

pub async fn update<C: ConnectionTrait>(conn: &C, mut active: ActiveModel) -> AppResult<Model> {
    active.updated_at = sea_orm::Set(now());
    Ok(active.update(conn).await?)
}

pub async fn soft_delete<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<()> {
    let result = Categories::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now()))
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Category"));
    }
    Ok(())
}

pub async fn slug_exists<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut finder = Categories::find().filter(Column::Slug.eq(slug));
    if let Some(id) = exclude_id {
        finder = finder.filter(Column::Id.ne(id));
    }
    Ok(finder.count(conn).await? > 0)
}
