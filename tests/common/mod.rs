#![allow(dead_code)]

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set, SqlxPostgresConnector};
use shop_backoffice_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::orders::{OrderItemInput, PlaceOrderRequest},
    entity::{
        coupons::{ActiveModel as CouponActive, CouponType, Model as CouponModel},
        orders::PaymentMethod,
        products::{ActiveModel as ProductActive, Model as ProductModel},
        users::{ActiveModel as UserActive, Role},
    },
    middleware::auth::AuthUser,
    repo::{coupon_repo, product_repo, user_repo},
    state::AppState,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";

const UNREACHABLE_DATABASE: &str = "postgres://postgres@127.0.0.1:1/unused";

/// State over a pool that never connects, for requests rejected before any query.
pub fn offline_state() -> AppState {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(StdDuration::from_secs(1))
        .connect_lazy(UNREACHABLE_DATABASE)
        .expect("valid connection url");
    let conn = SqlxPostgresConnector::from_sqlx_postgres_pool(pool);
    AppState::new(conn, AppConfig::for_database(UNREACHABLE_DATABASE, TEST_SECRET))
}

/// `None` when no database is configured, so the caller can skip.
pub async fn db_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            return Ok(None);
        }
    };

    let config = AppConfig::for_database(database_url, TEST_SECRET);
    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;
    Ok(Some(AppState::new(orm, config)))
}

pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &id[..10])
}

pub async fn seed_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let username = unique("u");
    let user = user_repo::create(
        &state.orm,
        UserActive {
            id: NotSet,
            username: Set(username.clone()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set("unused".into()),
            full_name: Set(None),
            phone: Set(None),
            address: Set(None),
            role: Set(role),
            is_active: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;
    Ok(AuthUser::new(user.id, user.username, user.role))
}

pub async fn seed_product(
    state: &AppState,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let sku = unique("SKU-").to_uppercase();
    Ok(product_repo::create(
        &state.orm,
        ProductActive {
            id: NotSet,
            name: Set(format!("Product {sku}")),
            description: Set(None),
            price: Set(price),
            sku: Set(sku),
            stock: Set(stock),
            category_id: Set(None),
            material: Set(None),
            color: Set(None),
            size: Set(None),
            is_active: Set(true),
            is_featured: Set(false),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?)
}

pub async fn seed_coupon(
    state: &AppState,
    coupon_type: CouponType,
    value: Decimal,
    max_discount_value: Option<Decimal>,
    usage_limit: i32,
) -> anyhow::Result<CouponModel> {
    let now = Utc::now();
    Ok(coupon_repo::create(
        &state.orm,
        CouponActive {
            id: NotSet,
            code: Set(unique("C").to_uppercase()),
            name: Set("Test coupon".into()),
            description: Set(None),
            coupon_type: Set(coupon_type),
            value: Set(value),
            min_order_amount: Set(Decimal::ZERO),
            max_discount_value: Set(max_discount_value),
            usage_limit: Set(usage_limit),
            used_count: Set(0),
            is_active: Set(true),
            start_date: Set((now - Duration::days(1)).into()),
            end_date: Set((now + Duration::days(30)).into()),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?)
}

pub fn order_request(items: &[(i64, i32)]) -> PlaceOrderRequest {
    let contact = unique("buyer");
    PlaceOrderRequest {
        payment_method: PaymentMethod::Cod,
        shipping_address: "12 Le Loi, District 1".into(),
        billing_address: None,
        customer_name: "Test Buyer".into(),
        customer_phone: "0901234567".into(),
        customer_email: format!("{contact}@example.com"),
        notes: None,
        coupon_code: None,
        items: items
            .iter()
            .map(|&(product_id, quantity)| OrderItemInput {
                product_id,
                quantity,
            })
            .collect(),
    }
}
