//! Database migration command.
//!
//! Reads `DATABASE_URL` from the environment (or a `.env` file) and applies
//! the migrations embedded from `crates/commerce/migrations/`.

use tracing::info;

use pomelo_commerce::{CommerceConfig, store};

use super::CliError;

/// Run the commerce database migrations.
///
/// # Errors
///
/// Returns [`CliError`] if configuration is missing, the database cannot be
/// reached, or a migration fails to apply.
pub async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let config = CommerceConfig::from_env()?;

    info!("Connecting to commerce database...");
    let pool = store::create_pool(&config.database_url, config.max_connections).await?;

    info!("Running commerce migrations...");
    sqlx::migrate!("../commerce/migrations").run(&pool).await?;

    info!("Commerce migrations complete!");
    Ok(())
}
