pub mod admin_service;
pub mod auth_service;
pub mod category_service;
pub mod coupon_service;
pub mod order_service;
pub mod order_state;
pub mod pricing;
pub mod product_service;
pub mod user_service;
