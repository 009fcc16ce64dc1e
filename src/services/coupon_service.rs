use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use validator::Validate;

use crate::{
    audit,
    dto::coupons::{CouponList, CouponRequest},
    entity::coupons::ActiveModel as CouponActive,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission, ensure_permission},
    models::Coupon,
    repo::coupon_repo,
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    state::AppState,
};

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_permission(user, Permission::ManageCoupons)?;
    let (page, limit, offset) = query.pagination().normalize();
    let (models, total) = coupon_repo::list(&state.orm, offset, limit).await?;
    let items = models.into_iter().map(Coupon::from).collect();
    Ok(ApiResponse::paginated(
        "Coupons",
        CouponList { items },
        Meta::new(page, limit, total),
    ))
}

pub async fn get_coupon(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_permission(user, Permission::ManageCoupons)?;
    let coupon = coupon_repo::get_by_id(&state.orm, id).await?;
    Ok(ApiResponse::success("Coupon", coupon.into()))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_permission(user, Permission::ManageCoupons)?;
    payload.validate()?;
    let code = normalize_code(&payload.code);
    if coupon_repo::code_exists(&state.orm, &code, None).await? {
        return Err(AppError::conflict(format!("Coupon code '{code}' already exists")));
    }

    let coupon = coupon_repo::create(
        &state.orm,
        CouponActive {
            id: NotSet,
            code: Set(code),
            name: Set(payload.name.trim().to_string()),
            description: Set(payload.description),
            coupon_type: Set(payload.coupon_type),
            value: Set(payload.value.round_dp(2)),
            min_order_amount: Set(payload.min_order_amount.round_dp(2)),
            max_discount_value: Set(payload.max_discount_value.map(|v| v.round_dp(2))),
            usage_limit: Set(payload.usage_limit),
            used_count: Set(0),
            is_active: Set(payload.is_active.unwrap_or(true)),
            start_date: Set(payload.start_date.into()),
            end_date: Set(payload.end_date.into()),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::success("Coupon created", coupon.into()))
}

/// Overwrites the coupon definition; `used_count` is kept.
pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: CouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_permission(user, Permission::ManageCoupons)?;
    payload.validate()?;
    let existing = coupon_repo::get_by_id(&state.orm, id).await?;
    let code = normalize_code(&payload.code);
    if coupon_repo::code_exists(&state.orm, &code, Some(id)).await? {
        return Err(AppError::conflict(format!("Coupon code '{code}' already exists")));
    }

    let mut active = existing.into_active_model();
    active.code = Set(code);
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.coupon_type = Set(payload.coupon_type);
    active.value = Set(payload.value.round_dp(2));
    active.min_order_amount = Set(payload.min_order_amount.round_dp(2));
    active.max_discount_value = Set(payload.max_discount_value.map(|v| v.round_dp(2)));
    active.usage_limit = Set(payload.usage_limit);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.start_date = Set(payload.start_date.into());
    active.end_date = Set(payload.end_date.into());
    let coupon = coupon_repo::update(&state.orm, active).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "coupon_update",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Coupon updated", coupon.into()))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_permission(user, Permission::ManageCoupons)?;
    coupon_repo::soft_delete(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "coupon_delete",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Coupon deleted", serde_json::json!({ "id": id })))
}
