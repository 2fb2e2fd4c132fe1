//! Database pool initialization.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend-as-a-service owns the schema (`user_metadata`,
//! `pipeline_configs`). Startup only opens the shared SQLx pool; no
//! migrations are run from here.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::env_parse;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Initialize the `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS))
        .connect(database_url)
        .await
}
