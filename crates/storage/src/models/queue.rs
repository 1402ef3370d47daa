use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A lease on one queued analysis held by a single worker.
#[derive(Debug, Clone, FromRow)]
pub struct QueueClaim {
    pub analysis_id: Uuid,
    pub claimed_by: String,
    pub deliveries: i32,
    pub lease_expires_at: DateTime<Utc>,
}

impl QueueClaim {
    /// True when an earlier delivery of the same entry was claimed and never acked.
    pub fn is_redelivery(&self) -> bool {
        self.deliveries > 1
    }
}
