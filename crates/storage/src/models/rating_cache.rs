use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::GameMode;

/// Last known rating of a handle in one game mode, shared by every analysis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CachedRating {
    pub handle: String,
    pub game_mode: GameMode,
    pub rating: i32,
    pub cached_at: DateTime<Utc>,
}

impl CachedRating {
    /// Whether the entry is older than `ttl` at `now`.
    ///
    /// The cache itself never expires entries; callers decide.
    pub fn is_stale(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        self.cached_at + ttl < now
    }
}
