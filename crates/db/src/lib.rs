//! PostgreSQL persistence for the exchange lifecycle.
//!
//! [`models`] holds the `FromRow` row types and their conversion into domain
//! types; [`repositories`] implements the `skillswap_core::repository` traits
//! on top of a shared [`DbPool`].

pub mod models;
pub mod repositories;

use skillswap_core::error::CoreError;
use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Map a sqlx error onto the domain error type.
///
/// Unique violations on constraints named `uq_*` become `Conflict`;
/// everything else is logged and reported as `Internal`.
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal("Database operation failed".to_string())
}

/// A stored column held a value the domain does not recognise.
pub(crate) fn corrupt_column(table: &str, column: &str, err: CoreError) -> CoreError {
    tracing::error!(table, column, error = %err, "Unreadable stored value");
    CoreError::Internal(format!("Unreadable value in {table}.{column}"))
}
