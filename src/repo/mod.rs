//! Thin data access layer. Every function takes any [`sea_orm::ConnectionTrait`],
//! so callers decide whether it runs on the pool or inside a transaction.
//! Reads never return soft-deleted rows; uniqueness checks do see them, because
//! the database constraints do.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

pub mod category_repo;
pub mod coupon_repo;
pub mod order_repo;
pub mod product_repo;
pub mod user_repo;

pub fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}
