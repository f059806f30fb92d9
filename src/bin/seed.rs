use std::env;

use exporium_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::Role,
    services::auth_service::{hash_password, normalize_email},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
        (Ok(email), Ok(password)) => {
            let id = ensure_staff_account(&pool, &email, &password, Role::Admin).await?;
            println!("Admin account ready: {id}");
        }
        _ => println!("SEED_ADMIN_EMAIL / SEED_ADMIN_PASSWORD not set; skipping admin account"),
    }
    seed_products(&pool).await?;

    println!("Seed completed");
    Ok(())
}

/// Create a verified staff account, or raise an existing one to `role`.
async fn ensure_staff_account(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let email = normalize_email(email);
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, email_verified)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        ON CONFLICT (email) DO UPDATE
            SET role = EXCLUDED.role, email_verified = TRUE, updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Store Admin")
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured {email} (role={role})");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        (
            "Air Runner 90",
            "Exporium",
            "running",
            "Breathable mesh upper with a cushioned foam midsole.",
            12_999_i64,
            "https://images.exporium.store/air-runner-90.jpg",
            40,
        ),
        (
            "Court Classic Low",
            "Exporium",
            "lifestyle",
            "Full-grain leather low-top with a cupsole.",
            9_499,
            "https://images.exporium.store/court-classic-low.jpg",
            60,
        ),
        (
            "Trail Grip GTX",
            "Northpeak",
            "trail",
            "Waterproof trail shoe with a lugged rubber outsole.",
            15_999,
            "https://images.exporium.store/trail-grip-gtx.jpg",
            25,
        ),
        (
            "Hoop Elevate Mid",
            "Rimline",
            "basketball",
            "Mid-cut basketball shoe with ankle support.",
            13_499,
            "https://images.exporium.store/hoop-elevate-mid.jpg",
            30,
        ),
    ];
    let sizes: Vec<String> = ["39", "40", "41", "42", "43", "44"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for (name, brand, category, description, price, image, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, brand, category, description, price, images, sizes, stock)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(brand)
        .bind(category)
        .bind(description)
        .bind(price)
        .bind(vec![image.to_string()])
        .bind(&sizes)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
