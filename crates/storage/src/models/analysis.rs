use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::NewOpponentRating;
use crate::error::{Result, StorageError};
use crate::services::ranking::RankingSummary;

/// Progress reported while an analysis is processing.
///
/// Indeterminate: the value only promises to stay between the pending and
/// completed values and never to decrease while the job is processing.
pub const PROCESSING_PROGRESS: u8 = 50;

/// Time-control category; a player holds one rating per mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "game_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Blitz,
    Rapid,
    Bullet,
    Daily,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
            Self::Bullet => "bullet",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "blitz" => Ok(Self::Blitz),
            "rapid" => Ok(Self::Rapid),
            "bullet" => Ok(Self::Bullet),
            "daily" => Ok(Self::Daily),
            other => Err(format!("unknown game mode '{other}'")),
        }
    }
}

/// Lifecycle of an analysis: `pending → processing → {completed, failed}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "analysis_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Derived progress percentage, never stored.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Pending | Self::Failed => 0,
            Self::Processing => PROCESSING_PROGRESS,
            Self::Completed => 100,
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's request to rank a chess handle among its past opponents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Analysis {
    pub analysis_id: Uuid,
    pub user_id: Uuid,
    pub chess_handle: String,
    pub game_mode: GameMode,
    pub end_date: NaiveDate,
    pub status: AnalysisStatus,
    pub user_current_rating: Option<i32>,
    pub user_position_in_ranking: Option<i32>,
    pub total_opponents: Option<i32>,
    pub percentile: Option<f64>,
    pub error_message: Option<String>,
    pub is_paid: bool,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Validated inputs of a new analysis.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub chess_handle: String,
    pub game_mode: GameMode,
    pub end_date: NaiveDate,
}

/// Everything written when an analysis enters `completed`.
#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    pub user_current_rating: i32,
    pub ranking: RankingSummary,
    pub opponents: Vec<NewOpponentRating>,
}

impl Analysis {
    pub fn new(user_id: Uuid, input: &NewAnalysis, now: DateTime<Utc>) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            user_id,
            chess_handle: input.chess_handle.clone(),
            game_mode: input.game_mode,
            end_date: input.end_date,
            status: AnalysisStatus::Pending,
            user_current_rating: None,
            user_position_in_ranking: None,
            total_opponents: None,
            percentile: None,
            error_message: None,
            is_paid: false,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    fn transition(&mut self, next: AnalysisStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(StorageError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn begin_processing(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(AnalysisStatus::Processing, now)
    }

    pub fn complete(&mut self, outcome: &CompletedAnalysis, now: DateTime<Utc>) -> Result<()> {
        self.transition(AnalysisStatus::Completed, now)?;
        self.user_current_rating = Some(outcome.user_current_rating);
        self.user_position_in_ranking = Some(outcome.ranking.position_in_ranking);
        self.total_opponents = Some(outcome.ranking.total_opponents);
        self.percentile = Some(outcome.ranking.percentile);
        Ok(())
    }

    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) -> Result<()> {
        self.transition(AnalysisStatus::Failed, now)?;
        self.error_message = Some(message.to_string());
        Ok(())
    }
}
