use sea_orm::{IntoActiveModel, Set};

use crate::{
    audit,
    dto::users::{UpdateRoleRequest, UserList},
    entity::users::{Model as UserModel, Role},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Permission, ensure_permission},
    models::User,
    repo::user_repo,
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    state::AppState,
};

/// An admin never acts on their own account here, and owner accounts need
/// the privileged permission.
fn ensure_can_manage(actor: &AuthUser, target: &UserModel) -> AppResult<()> {
    if actor.user_id == target.id {
        return Err(AppError::validation("You cannot modify your own account"));
    }
    if target.role == Role::Owner {
        ensure_permission(actor, Permission::ManagePrivilegedUsers)?;
    }
    Ok(())
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_permission(user, Permission::ManageUsers)?;
    let (page, limit, offset) = query.pagination().normalize();
    let (models, total) = user_repo::list(&state.orm, offset, limit).await?;
    let items = models.into_iter().map(User::from).collect();
    Ok(ApiResponse::paginated(
        "Users",
        UserList { items },
        Meta::new(page, limit, total),
    ))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: i64) -> AppResult<ApiResponse<User>> {
    ensure_permission(user, Permission::ManageUsers)?;
    let model = user_repo::get_by_id(&state.orm, id).await?;
    Ok(ApiResponse::success("User", model.into()))
}

pub async fn update_role(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateRoleRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_permission(user, Permission::ManageUsers)?;
    if payload.role == Role::Owner {
        return Err(AppError::validation("Role must be 'user' or 'admin'"));
    }
    let target = user_repo::get_by_id(&state.orm, id).await?;
    ensure_can_manage(user, &target)?;

    let old_role = target.role;
    let mut active = target.into_active_model();
    active.role = Set(payload.role);
    let updated = user_repo::update(&state.orm, active).await?;

    tracing::info!(target_user = id, actor = user.user_id, role = ?payload.role, "user role changed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": id, "from": old_role, "to": payload.role }),
    )
    .await;

    Ok(ApiResponse::success("User role updated", updated.into()))
}

pub async fn toggle_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<User>> {
    ensure_permission(user, Permission::ManageUsers)?;
    let target = user_repo::get_by_id(&state.orm, id).await?;
    ensure_can_manage(user, &target)?;

    let is_active = !target.is_active;
    let mut active = target.into_active_model();
    active.is_active = Set(is_active);
    let updated = user_repo::update(&state.orm, active).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "user_status_toggle",
        "users",
        serde_json::json!({ "user_id": id, "is_active": is_active }),
    )
    .await;

    let message = if is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(ApiResponse::success(message, updated.into()))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_permission(user, Permission::ManageUsers)?;
    let target = user_repo::get_by_id(&state.orm, id).await?;
    ensure_can_manage(user, &target)?;
    user_repo::soft_delete(&state.orm, id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success("User deleted", serde_json::json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: i64, role: Role) -> UserModel {
        let now = Utc::now().into();
        UserModel {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            full_name: None,
            phone: None,
            address: None,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn admins_cannot_target_themselves() {
        let admin = AuthUser::new(7, "boss", Role::Admin);
        assert!(matches!(
            ensure_can_manage(&admin, &account(7, Role::Admin)),
            Err(AppError::Validation(_))
        ));
        assert!(ensure_can_manage(&admin, &account(8, Role::User)).is_ok());
    }

    #[test]
    fn owner_accounts_need_privileged_permission() {
        let admin = AuthUser::new(7, "boss", Role::Admin);
        let owner = AuthUser::new(1, "root", Role::Owner);
        let target = account(2, Role::Owner);
        assert!(matches!(
            ensure_can_manage(&admin, &target),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_can_manage(&owner, &target).is_ok());
    }
}
