use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, Set};
use shop_backoffice_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::ActiveModel as CategoryActive, products::ActiveModel as ProductActive,
        users::{ActiveModel as UserActive, Role},
    },
    repo::{category_repo, product_repo, user_repo},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;

    let username = std::env::var("SEED_OWNER_USERNAME").unwrap_or_else(|_| "owner".into());
    let email = std::env::var("SEED_OWNER_EMAIL").unwrap_or_else(|_| "owner@example.com".into());
    let password = std::env::var("SEED_OWNER_PASSWORD").unwrap_or_else(|_| "owner123".into());

    ensure_owner(&orm, &username, &email, &password).await?;
    let category_id = ensure_category(&orm, "Áo dài", "ao-dai").await?;
    ensure_category(&orm, "Accessories", "accessories").await?;
    seed_products(&orm, category_id).await?;

    tracing::info!("seed completed");
    Ok(())
}

async fn ensure_owner(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if user_repo::username_exists(orm, username).await? {
        tracing::info!(username, "owner already present");
        return Ok(());
    }

    let user = user_repo::create(
        orm,
        UserActive {
            id: NotSet,
            username: Set(username.to_string()),
            email: Set(email.to_lowercase()),
            password_hash: Set(hash_password(password)?),
            full_name: Set(Some("Store Owner".into())),
            phone: Set(None),
            address: Set(None),
            role: Set(Role::Owner),
            is_active: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, username, "owner created");
    Ok(())
}

async fn ensure_category(orm: &DatabaseConnection, name: &str, slug: &str) -> anyhow::Result<i64> {
    if let Ok(existing) = category_repo::get_by_slug(orm, slug).await {
        return Ok(existing.id);
    }
    let category = category_repo::create(
        orm,
        CategoryActive {
            id: NotSet,
            name: Set(name.to_string()),
            description: Set(None),
            slug: Set(slug.to_string()),
            is_active: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: NotSet,
        },
    )
    .await?;
    tracing::info!(category_id = category.id, slug, "category created");
    Ok(category.id)
}

async fn seed_products(orm: &DatabaseConnection, category_id: i64) -> anyhow::Result<()> {
    let products = [
        ("Silk Áo Dài", "AD-SILK-01", Decimal::new(129_900, 2), 20),
        ("Cotton Áo Dài", "AD-COT-01", Decimal::new(79_500, 2), 35),
        ("Embroidered Scarf", "ACC-SCARF-01", Decimal::new(1_999, 2), 100),
    ];

    for (name, sku, price, stock) in products {
        if product_repo::sku_exists(orm, sku, None).await? {
            continue;
        }
        product_repo::create(
            orm,
            ProductActive {
                id: NotSet,
                name: Set(name.to_string()),
                description: Set(None),
                price: Set(price),
                sku: Set(sku.to_string()),
                stock: Set(stock),
                category_id: Set(Some(category_id)),
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
        .await?;
        tracing::info!(sku, "product created");
    }
    Ok(())
}
