use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use super::now;
use crate::{
    entity::users::{ActiveModel, Column, Entity as Users, Model},
    error::{AppError, AppResult},
};

pub async fn create<C: ConnectionTrait>(conn: &C, active: ActiveModel) -> AppResult<Model> {
    Ok(active.insert(conn).await?)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Model> {
    Users::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Matches either the username or the email address.
pub async fn find_by_login<C: ConnectionTrait>(conn: &C, login: &str) -> AppResult<Option<Model>> {
    Ok(Users::find()
        .filter(
            Condition::any()
                .add(Column::Username.eq(login))
                .add(Column::Email.eq(login.to_lowercase())),
        )
        .filter(Column::DeletedAt.is_null())
        .one(conn)
        .await?)
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    offset: i64,
    limit: i64,
) -> AppResult<(Vec<Model>, i64)> {
    let finder = Users::find()
        .filter(Column::DeletedAt.is_null())
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
    let result = Users::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now()))
        .col_expr(Column::IsActive, Expr::value(false))
        .filter(Column::Id.eq(id))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User"));
    }
    Ok(())
}

pub async fn username_exists<C: ConnectionTrait>(conn: &C, username: &str) -> AppResult<bool> {
    Ok(Users::find()
        .filter(Column::Username.eq(username))
        .count(conn)
        .await?
        > 0)
}

pub async fn email_exists<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut finder = Users::find().filter(Column::Email.eq(email));
    if let Some(id) = exclude_id {
        finder = finder.filter(Column::Id.ne(id));
    }
    Ok(finder.count(conn).await? > 0)
}
