//! Run-level mutual exclusion for the reveal worker.
//!
//! Backed by a PostgreSQL session advisory lock. The lock lives on one
//! pooled connection held for the duration of the run; if the process dies
//! mid-run the session closes and the lock is released by the server, so a
//! crashed run never wedges the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPool;
use sqlx::Postgres;
use tracing::warn;

use crate::infra::error::Result;
use crate::infra::traits::{LeaseGuard, RunLease};

/// Advisory lock key for the reveal run lease (ASCII "REVEAL01").
pub const REVEAL_RUN_LOCK_KEY: i64 = 0x5245_5645_414c_3031;

/// PostgreSQL run lease
pub struct PgRunLease {
    pool: PgPool,
}

impl PgRunLease {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLease for PgRunLease {
    async fn try_acquire(&self) -> Result<Option<Box<dyn LeaseGuard>>> {
        let mut conn = self.pool.acquire().await?;

        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(REVEAL_RUN_LOCK_KEY)
            .fetch_one(conn.as_mut())
            .await?;

        if !acquired {
            return Ok(None);
        }

        Ok(Some(Box::new(PgLeaseGuard { conn: Some(conn) })))
    }
}

/// Holds the pooled connection that owns the advisory lock.
struct PgLeaseGuard {
    conn: Option<PoolConnection<Postgres>>,
}

#[async_trait]
impl LeaseGuard for PgLeaseGuard {
    async fn release(mut self: Box<Self>) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        match sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(REVEAL_RUN_LOCK_KEY)
            .execute(conn.as_mut())
            .await
        {
            // Unlocked; the connection can go back to the pool.
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "failed to unlock run lease, closing its session");
                drop(conn.detach());
            }
        }
    }
}

impl Drop for PgLeaseGuard {
    fn drop(&mut self) {
        // release() was skipped. Returning the connection to the pool would
        // strand the lock on a live session, so close the session instead.
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Process-local lease for tests and single-instance deployments.
#[derive(Default)]
pub struct InMemoryRunLease {
    held: Arc<AtomicBool>,
}

impl InMemoryRunLease {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunLease for InMemoryRunLease {
    async fn try_acquire(&self) -> Result<Option<Box<dyn LeaseGuard>>> {
        let won = self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if !won {
            return Ok(None);
        }

        Ok(Some(Box::new(InMemoryLeaseGuard {
            held: Arc::clone(&self.held),
        })))
    }
}

struct InMemoryLeaseGuard {
    held: Arc<AtomicBool>,
}

#[async_trait]
impl LeaseGuard for InMemoryLeaseGuard {
    async fn release(self: Box<Self>) {
        self.held.store(false, Ordering::SeqCst);
    }
}

impl Drop for InMemoryLeaseGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}
