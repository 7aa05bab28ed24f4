pub mod models;
pub mod store;

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Build the shared connection pool from DATABASE_URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}
