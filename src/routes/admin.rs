use axum::{Router, middleware};

use crate::{
    middleware::auth::{require_admin, require_auth},
    routes::{categories, coupons, orders, products, users},
    state::AppState,
};

/// Everything under `/api/admin`. `require_auth` is added last so it runs first.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/categories", categories::admin_router())
        .nest("/products", products::admin_router())
        .nest("/orders", orders::admin_router())
        .nest("/coupons", coupons::admin_router())
        .nest("/users", users::admin_router())
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
