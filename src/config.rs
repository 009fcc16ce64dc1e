use std::{env, str::FromStr, time::Duration};

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub db_max_connections: u32,
    pub shipping_fee: Decimal,
    pub order_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let shipping_fee = env::var("SHIPPING_FEE")
            .ok()
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .filter(|fee| !fee.is_sign_negative())
            .unwrap_or(Decimal::ZERO)
            .round_dp(2);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_expire_hours: parse_or("JWT_EXPIRE_HOURS", 24),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
            shipping_fee,
            order_timeout: Duration::from_secs(parse_or("ORDER_TIMEOUT_SECS", 10)),
        })
    }

    /// Configuration for tests and tools that only need a database.
    pub fn for_database(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            jwt_expire_hours: 24,
            db_max_connections: 10,
            shipping_fee: Decimal::ZERO,
            order_timeout: Duration::from_secs(10),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
