use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::QueueClaim;

/// Work queue of analysis ids with lease based claims.
///
/// Delivery is at-least-once: an entry whose lease expires before it is
/// acked becomes claimable again. While a lease is live no other worker
/// can claim the entry.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue an analysis. Enqueuing an id already in the queue is a no-op.
    async fn enqueue(&self, analysis_id: Uuid) -> Result<()>;

    /// Claim the oldest entry that is unclaimed or whose lease has expired.
    async fn claim(&self, worker_id: &str, lease: Duration) -> Result<Option<QueueClaim>>;

    /// Remove the entry if `claim` still holds it. Returns whether it did.
    async fn ack(&self, claim: &QueueClaim) -> Result<bool>;

    /// Push the lease of a still-held claim to `lease` from now. Returns
    /// `false` once the claim was lost to a later delivery.
    async fn extend_lease(&self, claim: &QueueClaim, lease: Duration) -> Result<bool>;

    /// Enqueue every `pending` or `processing` analysis missing from the
    /// queue. Returns how many entries were added.
    async fn requeue_unfinished(&self) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, analysis_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO analysis_queue (analysis_id) VALUES ($1) ON CONFLICT (analysis_id) DO NOTHING",
        )
        .bind(analysis_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Uses `FOR UPDATE SKIP LOCKED` so concurrent dispatchers never claim
    /// the same entry.
    async fn claim(&self, worker_id: &str, lease: Duration) -> Result<Option<QueueClaim>> {
        let claim = sqlx::query_as::<_, QueueClaim>(
            r#"
            UPDATE analysis_queue
            SET claimed_by = $1,
                lease_expires_at = NOW() + make_interval(secs => $2),
                deliveries = deliveries + 1
            WHERE analysis_id = (
                SELECT analysis_id FROM analysis_queue
                WHERE lease_expires_at IS NULL OR lease_expires_at < NOW()
                ORDER BY enqueued_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING analysis_id, claimed_by, deliveries, lease_expires_at
            "#,
        )
        .bind(worker_id)
        .bind(lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(claim)
    }

    async fn ack(&self, claim: &QueueClaim) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM analysis_queue WHERE analysis_id = $1 AND claimed_by = $2 AND deliveries = $3",
        )
        .bind(claim.analysis_id)
        .bind(&claim.claimed_by)
        .bind(claim.deliveries)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn extend_lease(&self, claim: &QueueClaim, lease: Duration) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_queue
            SET lease_expires_at = NOW() + make_interval(secs => $4)
            WHERE analysis_id = $1 AND claimed_by = $2 AND deliveries = $3
            "#,
        )
        .bind(claim.analysis_id)
        .bind(&claim.claimed_by)
        .bind(claim.deliveries)
        .bind(lease.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn requeue_unfinished(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO analysis_queue (analysis_id)
            SELECT analysis_id FROM analyses
            WHERE status IN ('pending', 'processing')
            ORDER BY created_at
            ON CONFLICT (analysis_id) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
