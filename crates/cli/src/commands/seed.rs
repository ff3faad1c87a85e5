//! Seed the database with demo catalog data.
//!
//! Inserts a handful of products and shipping addresses so the cart and
//! checkout flows can be exercised against a fresh database. Idempotent per
//! product name: rerunning the command skips rows that already exist.

use rust_decimal::Decimal;
use tracing::info;

use pomelo_commerce::{CommerceConfig, store};
use pomelo_core::Money;

use super::CliError;

const DEMO_PRODUCTS: &[(&str, &str, i64, i32)] = &[
    ("Mechanical Keyboard", "Tenkeyless, hot-swappable switches", 8999, 25),
    ("Wireless Mouse", "Low-latency 2.4 GHz receiver", 3499, 40),
    ("USB-C Hub", "7-in-1 with HDMI and card reader", 4599, 15),
    ("Laptop Stand", "Aluminium, adjustable height", 2999, 30),
    ("Webcam", "1080p with privacy shutter", 5499, 10),
];

/// Seed demo products and addresses.
///
/// # Errors
///
/// Returns [`CliError`] if configuration is missing or a database write
/// fails.
pub async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let config = CommerceConfig::from_env()?;

    info!("Connecting to commerce database...");
    let pool = store::create_pool(&config.database_url, config.max_connections).await?;

    let mut inserted = 0_u32;
    for &(name, description, price_cents, stock) in DEMO_PRODUCTS {
        let price = Money::new(Decimal::new(price_cents, 2));
        let result = sqlx::query(
            "INSERT INTO commerce.product (name, description, price, stock_quantity)
             SELECT $1, $2, $3, $4
             WHERE NOT EXISTS (SELECT 1 FROM commerce.product WHERE name = $1)",
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .execute(&pool)
        .await?;
        inserted += u32::try_from(result.rows_affected()).unwrap_or(0);
    }
    info!(inserted, "Seeded products");

    let result = sqlx::query(
        "INSERT INTO commerce.address (street, building_name, city, state, country, pincode)
         SELECT * FROM (VALUES
             ('1 Market Street', 'Suite 400', 'San Francisco', 'CA', 'US', '94105'),
             ('42 Harbour Road', NULL, 'Portland', 'OR', 'US', '97201')
         ) AS seed (street, building_name, city, state, country, pincode)
         WHERE NOT EXISTS (SELECT 1 FROM commerce.address)",
    )
    .execute(&pool)
    .await?;
    info!(inserted = result.rows_affected(), "Seeded addresses");

    Ok(())
}
