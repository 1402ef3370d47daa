use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Analysis, AnalysisStatus, GameMode, NewAnalysis, OpponentRating};

const MIN_HANDLE_LENGTH: usize = 3;
const MAX_HANDLE_LENGTH: usize = 100;

/// Request payload for submitting a new analysis
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAnalysisRequest {
    #[validate(custom(function = "validate_chess_handle"))]
    pub chess_handle: String,

    pub end_date: NaiveDate,

    pub game_mode: GameMode,
}

impl CreateAnalysisRequest {
    pub fn to_new_analysis(&self) -> NewAnalysis {
        NewAnalysis {
            chess_handle: self.chess_handle.trim().to_string(),
            game_mode: self.game_mode,
            end_date: self.end_date,
        }
    }
}

fn validate_chess_handle(handle: &str) -> Result<(), validator::ValidationError> {
    let length = handle.trim().chars().count();

    if length < MIN_HANDLE_LENGTH {
        let mut error = validator::ValidationError::new("handle_too_short");
        error.message = Some("Chess handle must be at least 3 characters long.".into());
        return Err(error);
    }
    if length > MAX_HANDLE_LENGTH {
        let mut error = validator::ValidationError::new("handle_too_long");
        error.message = Some("Chess handle must be at most 100 characters long.".into());
        return Err(error);
    }

    Ok(())
}

/// Response returned once an analysis has been accepted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAnalysisResponse {
    pub analysis_id: Uuid,
    pub message: String,
    pub status: AnalysisStatus,
    pub chess_handle: String,
    pub game_mode: GameMode,
    pub end_date: NaiveDate,
}

impl From<Analysis> for CreateAnalysisResponse {
    fn from(analysis: Analysis) -> Self {
        Self {
            analysis_id: analysis.analysis_id,
            message: "Analysis created successfully!".to_string(),
            status: analysis.status,
            chess_handle: analysis.chess_handle,
            game_mode: analysis.game_mode,
            end_date: analysis.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpponentRatingResponse {
    pub opponent_handle: String,
    pub current_rating: i32,
    pub created_at: DateTime<Utc>,
}

impl From<OpponentRating> for OpponentRatingResponse {
    fn from(opponent: OpponentRating) -> Self {
        Self {
            opponent_handle: opponent.opponent_handle,
            current_rating: opponent.current_rating,
            created_at: opponent.created_at,
        }
    }
}

/// Full analysis detail, including nested opponents
///
/// When `results_withheld` is set, the ranking (`user_position_in_ranking`,
/// `total_opponents`, `percentile`) and `opponent_ratings` are omitted until
/// the analysis is paid.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub chess_handle: String,
    pub end_date: NaiveDate,
    pub game_mode: GameMode,
    pub status: AnalysisStatus,
    pub progress: u8,
    pub user_current_rating: Option<i32>,
    pub user_position_in_ranking: Option<i32>,
    pub total_opponents: Option<i32>,
    pub percentile: Option<f64>,
    pub error_message: Option<String>,
    pub is_paid: bool,
    pub results_withheld: bool,
    pub opponent_ratings: Option<Vec<OpponentRatingResponse>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisResponse {
    pub fn new(analysis: Analysis, opponents: Vec<OpponentRating>, withhold_results: bool) -> Self {
        let progress = analysis.progress();
        let opponent_ratings = (!withhold_results)
            .then(|| opponents.into_iter().map(OpponentRatingResponse::from).collect());

        Self {
            analysis_id: analysis.analysis_id,
            chess_handle: analysis.chess_handle,
            end_date: analysis.end_date,
            game_mode: analysis.game_mode,
            status: analysis.status,
            progress,
            user_current_rating: analysis.user_current_rating,
            user_position_in_ranking: analysis
                .user_position_in_ranking
                .filter(|_| !withhold_results),
            total_opponents: analysis.total_opponents.filter(|_| !withhold_results),
            percentile: analysis.percentile.filter(|_| !withhold_results),
            error_message: analysis.error_message,
            is_paid: analysis.is_paid,
            results_withheld: withhold_results,
            opponent_ratings,
            created_at: analysis.created_at,
            updated_at: analysis.updated_at,
            completed_at: analysis.completed_at,
        }
    }
}

/// Lightweight status view for polling
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisStatusResponse {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
    /// 0 while pending or failed, 100 once completed, indeterminate in between.
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub chess_handle: String,
    pub game_mode: GameMode,
}

impl From<Analysis> for AnalysisStatusResponse {
    fn from(analysis: Analysis) -> Self {
        Self {
            analysis_id: analysis.analysis_id,
            status: analysis.status,
            progress: analysis.progress(),
            error_message: analysis.error_message,
            created_at: analysis.created_at,
            completed_at: analysis.completed_at,
            chess_handle: analysis.chess_handle,
            game_mode: analysis.game_mode,
        }
    }
}

/// Ranking among opponents. Withheld like [`AnalysisResponse`], except for
/// the user's own rating.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpponentsResponse {
    pub analysis_id: Uuid,
    pub total_opponents: Option<i32>,
    pub user_rating: Option<i32>,
    pub user_position: Option<i32>,
    pub percentile: Option<f64>,
    pub results_withheld: bool,
    pub opponents: Option<Vec<OpponentRatingResponse>>,
}

impl OpponentsResponse {
    pub fn new(analysis: Analysis, opponents: Vec<OpponentRating>, withhold_results: bool) -> Self {
        let total_opponents = (!withhold_results).then_some(opponents.len() as i32);

        Self {
            analysis_id: analysis.analysis_id,
            total_opponents,
            user_rating: analysis.user_current_rating,
            user_position: analysis.user_position_in_ranking.filter(|_| !withhold_results),
            percentile: analysis.percentile.filter(|_| !withhold_results),
            results_withheld: withhold_results,
            opponents: (!withhold_results)
                .then(|| opponents.into_iter().map(OpponentRatingResponse::from).collect()),
        }
    }
}

/// Request payload for recording an external payment
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct MarkPaidRequest {
    #[validate(length(min = 1, max = 255))]
    pub payment_reference: Option<String>,
}
