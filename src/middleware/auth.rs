use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    entity::users::Role,
    error::{AppError, AppResult},
    repo::user_repo,
    state::AppState,
};

/// Capabilities granted by a role. Handlers check these instead of comparing role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    AccessAdmin,
    ManageCatalog,
    ManageOrders,
    ManageCoupons,
    ManageUsers,
    /// Modify owner accounts.
    ManagePrivilegedUsers,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AccessAdmin,
    Permission::ManageCatalog,
    Permission::ManageOrders,
    Permission::ManageCoupons,
    Permission::ManageUsers,
];

const OWNER_PERMISSIONS: &[Permission] = &[
    Permission::AccessAdmin,
    Permission::ManageCatalog,
    Permission::ManageOrders,
    Permission::ManageCoupons,
    Permission::ManageUsers,
    Permission::ManagePrivilegedUsers,
];

impl Role {
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::User => &[],
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Owner => OWNER_PERMISSIONS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, user_id: i64, username: &str, role: Role) -> AppResult<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(self.ttl_hours))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    pub fn verify(&self, token: &str) -> AppResult<AuthUser> {
        let decoded = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user_id = decoded
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser::new(
            user_id,
            decoded.claims.username,
            decoded.claims.role,
        ))
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    permissions: &'static [Permission],
}

impl AuthUser {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            permissions: role.permissions(),
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

pub fn ensure_permission(user: &AuthUser, permission: Permission) -> Result<(), AppError> {
    if !user.can(permission) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// `Ok(None)` when no Authorization header is present.
fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

    Ok(Some(token))
}

/// Verify the token, then load the account it names. Role and active flag
/// come from the stored row, not from the claims.
async fn resolve_user(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let claimed = state.jwt.verify(token)?;
    let account = match user_repo::get_by_id(&state.orm, claimed.user_id).await {
        Ok(account) => account,
        Err(AppError::NotFound(_)) => {
            tracing::warn!(user_id = claimed.user_id, "token for missing account");
            return Err(AppError::Unauthorized("Account no longer exists".into()));
        }
        Err(err) => return Err(err),
    };
    if !account.is_active {
        tracing::warn!(user_id = account.id, "token for disabled account");
        return Err(AppError::Unauthorized("Account is disabled".into()));
    }
    Ok(AuthUser::new(account.id, account.username, account.role))
}

async fn authenticate(parts: &Parts, state: &AppState) -> AppResult<Option<AuthUser>> {
    if let Some(user) = parts.extensions.get::<AuthUser>() {
        return Ok(Some(user.clone()));
    }
    match bearer_token(&parts.headers)? {
        Some(token) => resolve_user(state, token).await.map(Some),
        None => Ok(None),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))
    }
}

/// Optional identity: guests send no header, but a header that is sent must be valid.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(authenticate(parts, state).await?))
    }
}

/// Resolve the bearer token to a live account and store it in request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?
        .ok_or_else(|| {
            tracing::warn!(uri = %req.uri(), "missing bearer token");
            AppError::Unauthorized("Missing Authorization header".into())
        })?
        .to_owned();

    let user = resolve_user(&state, &token).await.inspect_err(|err| {
        tracing::warn!(uri = %req.uri(), error = %err, "rejected bearer token");
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    if !user.can(Permission::AccessAdmin) {
        tracing::warn!(user_id = user.user_id, uri = %req.uri(), "admin route denied");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_resolve_to_permissions() {
        let user = AuthUser::new(1, "alice", Role::User);
        assert!(!user.can(Permission::AccessAdmin));

        let admin = AuthUser::new(2, "bob", Role::Admin);
        assert!(admin.can(Permission::ManageOrders));
        assert!(!admin.can(Permission::ManagePrivilegedUsers));

        let owner = AuthUser::new(3, "root", Role::Owner);
        assert!(owner.can(Permission::ManagePrivilegedUsers));
        assert!(ensure_permission(&owner, Permission::ManageCatalog).is_ok());
        assert!(matches!(
            ensure_permission(&user, Permission::ManageCatalog),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn issued_token_verifies() {
        let keys = JwtKeys::new("test-secret", 1);
        let token = keys.issue(42, "carol", Role::Admin).unwrap();
        let user = keys.verify(&token).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.username, "carol");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = JwtKeys::new("one", 1).issue(1, "dave", Role::User).unwrap();
        let err = JwtKeys::new("two", 1).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).unwrap().is_none());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc"));
    }
}
