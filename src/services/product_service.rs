use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use validator::Validate;

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, ProductList, SetStockRequest, StockUpdate, UpdateProductRequest,
    },
    entity::products::ActiveModel as ProductActive,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission, ensure_permission},
    models::Product,
    repo::{
        category_repo,
        product_repo::{self, ProductFilter},
    },
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}

async fn ensure_category(state: &AppState, category_id: Option<i64>) -> AppResult<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    match category_repo::get_by_id(&state.orm, id).await {
        Ok(_) => Ok(()),
        Err(AppError::NotFound(_)) => Err(AppError::validation(format!(
            "Category {id} does not exist"
        ))),
        Err(err) => Err(err),
    }
}

/// Public listing shows active products only; the admin listing shows all of them.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
    active_only: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = ProductFilter {
        category_id: query.category_id,
        search: query.q,
        active_only,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
    };

    let (models, total) = product_repo::list(&state.orm, &filter, offset, limit).await?;
    let items = models.into_iter().map(Product::from).collect();

    Ok(ApiResponse::paginated(
        "Products",
        ProductList { items },
        Meta::new(page, limit, total),
    ))
}

pub async fn get_product(
    state: &AppState,
    id: i64,
    active_only: bool,
) -> AppResult<ApiResponse<Product>> {
    let product = product_repo::get_by_id(&state.orm, id).await?;
    if active_only && !product.is_active {
        return Err(AppError::NotFound("Product"));
    }
    Ok(ApiResponse::success("Product", product.into()))
}

pub async fn get_product_by_sku(state: &AppState, sku: &str) -> AppResult<ApiResponse<Product>> {
    let product = product_repo::get_by_sku(&state.orm, &normalize_sku(sku)).await?;
    if !product.is_active {
        return Err(AppError::NotFound("Product"));
    }
    Ok(ApiResponse::success("Product", product.into()))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    payload.validate()?;
    let sku = normalize_sku(&payload.sku);
    if product_repo::sku_exists(&state.orm, &sku, None).await? {
        return Err(AppError::conflict(format!("SKU '{sku}' already exists")));
    }
    ensure_category(state, payload.category_id).await?;

    let product = product_repo::create(
        &state.orm,
        ProductActive {
            id: NotSet,
            name: Set(payload.name.trim().to_string()),
            description: Set(payload.description),
            price: Set(payload.price.round_dp(2)),
            sku: Set(sku),
            stock: Set(payload.stock),
            category_id: Set(payload.category_id),
            material: Set(payload.material),
            color: Set(payload.color),
            size: Set(payload.size),
            is_active: Set(payload.is_active.unwrap_or(true)),
            is_featured: Set(payload.is_featured.unwrap_or(false)),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "sku": product.sku }),
    )
    .await;

    Ok(ApiResponse::success("Product created", product.into()))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    payload.validate()?;
    let existing = product_repo::get_by_id(&state.orm, id).await?;
    let sku = normalize_sku(&payload.sku);
    if product_repo::sku_exists(&state.orm, &sku, Some(id)).await? {
        return Err(AppError::conflict(format!("SKU '{sku}' already exists")));
    }
    ensure_category(state, payload.category_id).await?;

    let mut active = existing.into_active_model();
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.price = Set(payload.price.round_dp(2));
    active.sku = Set(sku);
    active.category_id = Set(payload.category_id);
    active.material = Set(payload.material);
    active.color = Set(payload.color);
    active.size = Set(payload.size);
    active.is_active = Set(payload.is_active);
    active.is_featured = Set(payload.is_featured);

    let product = product_repo::update(&state.orm, active).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Product updated", product.into()))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    product_repo::soft_delete(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Product deleted", serde_json::json!({ "id": id })))
}

/// Manual stock correction guarded by the caller's view of the current value.
pub async fn set_stock(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: SetStockRequest,
) -> AppResult<ApiResponse<StockUpdate>> {
    ensure_permission(user, Permission::ManageCatalog)?;
    payload.validate()?;
    let product = product_repo::get_by_id(&state.orm, id).await?;

    if !product_repo::set_stock(&state.orm, id, payload.expected_stock, payload.stock).await? {
        tracing::warn!(
            product_id = id,
            expected = payload.expected_stock,
            actual = product.stock,
            "stale stock update rejected"
        );
        return Err(AppError::conflict(
            "Stock changed since it was read; reload and retry",
        ));
    }

    tracing::info!(
        product_id = id,
        old_stock = payload.expected_stock,
        new_stock = payload.stock,
        "stock set"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_stock_set",
        "products",
        serde_json::json!({
            "product_id": id,
            "old_stock": payload.expected_stock,
            "new_stock": payload.stock,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Stock updated",
        StockUpdate {
            product_id: id,
            old_stock: payload.expected_stock,
            new_stock: payload.stock,
        },
    ))
}
