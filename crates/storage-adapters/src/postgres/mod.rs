//! # Postgres storage (feature `db-postgres`)
//!
//! Implements every port over a sqlx [`PgPool`]. Post paths are stored as
//! `BIGINT[]` so the tree orderings are plain array comparisons evaluated by
//! the database against the `(thread_id, array_append(parents, id))` index.

mod catalog;
mod posts;
mod rows;
mod tx;

use async_trait::async_trait;
use domains::{
    DomainError, DomainResult, Status, StatusRepository, StorageMaintenance, StoreTx,
    Transactional,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

pub use tx::PgTx;

/// Maps a driver error onto the domain taxonomy. Unique violations become
/// [`DomainError::Conflict`]; everything else is internal.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::Conflict(db.message().to_owned())
        }
        _ => DomainError::internal(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool of at most `max_connections` connections to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DomainError::internal)?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Transactional for PgStore {
    async fn begin(&self) -> DomainResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgTx::new(tx)))
    }
}

#[async_trait]
impl StatusRepository for PgStore {
    async fn status(&self) -> DomainResult<Status> {
        let (user, forum, thread, post): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT count(*) FROM users), (SELECT count(*) FROM forums), \
             (SELECT count(*) FROM threads), (SELECT count(*) FROM posts)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(Status {
            user,
            forum,
            thread,
            post,
        })
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> DomainResult<()> {
        sqlx::query("TRUNCATE forum_users, votes, posts, threads, forums, users")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl StorageMaintenance for PgStore {
    /// Rewrites `posts` in `(thread_id, path)` order, then refreshes planner
    /// statistics. `VACUUM` cannot run inside a transaction block, so it goes
    /// straight to the pool.
    async fn reorganize(&self) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("CLUSTER posts USING posts_thread_path_idx")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        sqlx::query("VACUUM ANALYZE posts")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
