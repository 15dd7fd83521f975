//! Store gateway: domain-typed operations over the external Postgres
//! datastore. Callers never see SQL; batch sizes, pagination and conflict
//! handling live here.

pub mod images;
mod logs;
mod news;
mod politicians;
mod retention;
mod social;
mod sources;
mod topics;

pub use images::ImageStore;
pub use news::diversify_by_source;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Rows per upsert chunk. Providers rarely return more than a few dozen
/// records per call, but regional sweeps can accumulate.
pub(crate) const BATCH_CHUNK: usize = 100;

/// Rows per page for full roster scans.
pub(crate) const SCAN_PAGE: i64 = 1000;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to the datastore with a bounded connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to the datastore")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("migration failed")?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
