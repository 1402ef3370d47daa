use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Rating snapshot of one opponent, owned by an analysis.
///
/// At most one row exists per (analysis, opponent handle).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OpponentRating {
    pub opponent_rating_id: Uuid,
    pub analysis_id: Uuid,
    pub opponent_handle: String,
    pub current_rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Opponent snapshot produced by the orchestrator, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOpponentRating {
    pub opponent_handle: String,
    pub current_rating: i32,
}
