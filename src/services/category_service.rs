use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use validator::Validate;

use crate::{
    audit,
    dto::categories::{CategoryList, CategoryRequest},
    entity::categories::ActiveModel as CategoryActive,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission, ensure_permission},
    models::Category,
    repo::category_repo,
    response::ApiResponse,
    state::AppState,
};

/// Trimmed, lowercased, whitespace runs replaced by `-`.
pub fn normalize_slug(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn slug_for(payload: &CategoryRequest) -> AppResult<String> {
    let slug = normalize_slug(payload.slug.as_deref().unwrap_or(&payload.name));
    if slug.is_empty() {
        return Err(AppError::validation("Slug must not be empty"));
    }
    Ok(slug)
}

pub async fn list_categories(
    state: &AppState,
    active_only: bool,
) -> AppResult<ApiResponse<CategoryList>> {
    let items = category_repo::list(&state.orm, active_only)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(ApiResponse::success("Categories", CategoryList { items }))
}

pub async fn get_category(state: &AppState, id: i64) -> AppResult<ApiResponse<Category>> {
    let category = category_repo::get_by_id(&state.orm, id).await?;
    Ok(ApiResponse::success("Category", category.into()))
}

pub async fn get_category_by_slug(
    state: &AppState,
    slug: &str,
) -> AppResult<ApiResponse<Category>> {
    let category = category_repo::get_by_slug(&state.orm, &normalize_slug(slug)).await?;
    Ok(ApiResponse::success("Category", category.into()))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    payload.validate()?;
    let slug = slug_for(&payload)?;
    if category_repo::slug_exists(&state.orm, &slug, None).await? {
        return Err(AppError::conflict(format!("Slug '{slug}' already exists")));
    }

    let category = category_repo::create(
        &state.orm,
        CategoryActive {
            id: NotSet,
            name: Set(payload.name.trim().to_string()),
            description: Set(payload.description),
            slug: Set(slug),
            is_active: Set(payload.is_active.unwrap_or(true)),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success("Category created", category.into()))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    payload.validate()?;
    let existing = category_repo::get_by_id(&state.orm, id).await?;
    let slug = slug_for(&payload)?;
    if category_repo::slug_exists(&state.orm, &slug, Some(id)).await? {
        return Err(AppError::conflict(format!("Slug '{slug}' already exists")));
    }

    let mut active = existing.into_active_model();
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.slug = Set(slug);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let category = category_repo::update(&state.orm, active).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Category updated", category.into()))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    category_repo::soft_delete(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Category deleted", serde_json::json!({ "id": id })))
}
