//! Relational repository over PostgreSQL.
//!
//! [`Repository`] wraps the connection pool for single-statement operations;
//! [`RepositoryTx`] wraps a transaction for the multi-statement provisioning
//! flows. Dropping a `RepositoryTx` without calling [`RepositoryTx::commit`]
//! rolls the transaction back, so every early-return path is covered.

mod api_keys;
mod error;
mod groups;
mod models;
mod users;

pub use error::{DbError, DbResult};
pub use models::{ApiKey, Group, GroupMember, InsertApiKeyParams, User, UserParams};

use sqlx::{PgPool, Postgres, Transaction};

/// Repository over the shared PostgreSQL pool.
#[derive(Clone)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool from a database URL.
    pub async fn connect(url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self::new(pool))
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a transaction for a provisioning flow.
    pub async fn begin(&self) -> DbResult<RepositoryTx> {
        let tx = self.pool.begin().await?;
        Ok(RepositoryTx { tx })
    }

    /// Run migrations using sqlx's migration runner.
    pub async fn run_migrations(&self) -> DbResult<()> {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Health check for database connectivity.
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A repository handle bound to one transaction.
///
/// Owned exclusively by the request that began it. Rolls back on drop unless
/// committed.
pub struct RepositoryTx {
    tx: Transaction<'static, Postgres>,
}

impl RepositoryTx {
    pub(crate) fn executor(&mut self) -> &mut sqlx::PgConnection {
        &mut self.tx
    }

    /// Commit the transaction, making all changes visible.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Explicitly roll the transaction back. Dropping the handle has the
    /// same effect; this exists for call sites that want to be loud about it.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
