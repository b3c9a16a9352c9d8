//! Connection pool creation and the `SERVICE_MODE=INIT` migration runner.
//!
//! Mirrors the teacher's `repository::create_pool` / `db::migrate` split:
//! a plain `sqlx::PgPool` factory plus a tiny migration tracker that each
//! service's `migrations` module feeds SQL statements into.

use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::{Error, Result};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.connection_url())
        .await?;
    Ok(pool)
}

/// A single forward-only migration statement, applied once and recorded in
/// `_migrations` so repeated `SERVICE_MODE=INIT` runs are idempotent.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

pub async fn run_migrations(pool: &PgPool, migrations: &[Migration]) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(Error::from)?;

    for migration in migrations {
        let already_applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
                .bind(migration.version)
                .fetch_one(pool)
                .await
                .map_err(Error::from)?;

        if already_applied {
            continue;
        }

        info!(version = migration.version, name = migration.name, "applying migration");

        let mut tx = pool.begin().await.map_err(Error::from)?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(Error::from)?;
        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(Error::from)?;
        tx.commit().await.map_err(Error::from)?;
    }

    Ok(())
}
