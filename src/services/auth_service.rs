use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use validator::Validate;

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
    entity::users::{ActiveModel as UserActive, Role},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    repo::user_repo,
    response::ApiResponse,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid username/email or password";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if user_repo::username_exists(&state.orm, &username).await? {
        return Err(AppError::conflict("Username is already taken"));
    }
    if user_repo::email_exists(&state.orm, &email, None).await? {
        return Err(AppError::conflict("Email is already taken"));
    }

    let user = user_repo::create(
        &state.orm,
        UserActive {
            id: NotSet,
            username: Set(username),
            email: Set(email),
            password_hash: Set(hash_password(&payload.password)?),
            full_name: Set(payload.full_name),
            phone: Set(payload.phone),
            address: Set(None),
            role: Set(Role::User),
            is_active: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    tracing::info!(user_id = user.id, "user registered");

    Ok(ApiResponse::success("User created", user.into()))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    payload.validate()?;
    let user = user_repo::find_by_login(&state.orm, payload.login.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "failed login");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is disabled".into()));
    }

    let token = state.jwt.issue(user.id, &user.username, user.role)?;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            token_type: "Bearer".into(),
            user: user.into(),
        },
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = user_repo::get_by_id(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Profile", model.into()))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    let existing = user_repo::get_by_id(&state.orm, user.user_id).await?;
    let mut active = existing.into_active_model();

    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if user_repo::email_exists(&state.orm, &email, Some(user.user_id)).await? {
            return Err(AppError::conflict("Email is already taken"));
        }
        active.email = Set(email);
    }
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(Some(full_name));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(Some(address));
    }

    let updated = user_repo::update(&state.orm, active).await?;
    Ok(ApiResponse::success("Profile updated", updated.into()))
}
