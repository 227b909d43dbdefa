pub mod schema;

pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{info, instrument};

use crate::error::AppError;

/// Opens a pool on `database_url` and applies [`CURRENT_SCHEMA`].
#[instrument]
pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // In-memory databases are per-connection, so they get exactly one.
    let in_memory = database_url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

#[instrument(skip(pool))]
pub async fn apply_schema(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Applying database schema");
    sqlx::raw_sql(CURRENT_SCHEMA).execute(pool).await?;
    Ok(())
}
