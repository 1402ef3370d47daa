use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Analysis, AnalysisStatus, CompletedAnalysis, NewAnalysis, OpponentRating};

const COLUMNS: &str = "\
    analysis_id, user_id, chess_handle, game_mode, end_date, status, \
    user_current_rating, user_position_in_ranking, total_opponents, percentile, \
    error_message, is_paid, payment_reference, created_at, updated_at, completed_at";

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Insert a new `pending` analysis owned by `user_id`.
    async fn create(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis>;

    /// Like [`Self::create`], adding the analysis to the work queue in the
    /// same atomic step. Either both exist afterwards or neither does.
    async fn create_queued(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis>;

    /// Unscoped lookup, reserved for the worker.
    async fn find_by_id(&self, analysis_id: Uuid) -> Result<Analysis>;

    /// Lookup scoped to the owner. Analyses of other users are `NotFound`.
    async fn find_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Analysis>;

    /// All analyses of `user_id`, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Analysis>>;

    /// Opponent snapshots, highest rating first.
    async fn opponents(&self, analysis_id: Uuid) -> Result<Vec<OpponentRating>>;

    /// `pending → processing`. Fails with `InvalidTransition` from any other state.
    async fn begin_processing(&self, analysis_id: Uuid) -> Result<Analysis>;

    /// `processing → completed`, writing results and opponents in one atomic step.
    async fn complete(&self, analysis_id: Uuid, outcome: &CompletedAnalysis) -> Result<Analysis>;

    /// `processing → failed` with a human readable reason.
    async fn fail(&self, analysis_id: Uuid, message: &str) -> Result<Analysis>;

    async fn mark_paid(&self, analysis_id: Uuid, payment_reference: Option<&str>) -> Result<Analysis>;
}

#[derive(Clone)]
pub struct PgAnalysisRepository {
    pool: PgPool,
}

impl PgAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explains why a conditional status update matched no row.
    async fn transition_error(&self, analysis_id: Uuid, to: AnalysisStatus) -> StorageError {
        let current = sqlx::query_scalar::<_, AnalysisStatus>(
            "SELECT status FROM analyses WHERE analysis_id = $1",
        )
        .bind(analysis_id)
        .fetch_optional(&self.pool)
        .await;

        match current {
            Ok(Some(from)) => StorageError::InvalidTransition { from, to },
            Ok(None) => StorageError::NotFound,
            Err(e) => StorageError::Database(e),
        }
    }
}

#[async_trait]
impl AnalysisRepository for PgAnalysisRepository {
    async fn create(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis> {
        let query = format!(
            "INSERT INTO analyses (analysis_id, user_id, chess_handle, game_mode, end_date, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let analysis = sqlx::query_as::<_, Analysis>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&input.chess_handle)
            .bind(input.game_mode)
            .bind(input.end_date)
            .bind(AnalysisStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        Ok(analysis)
    }

    async fn create_queued(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO analyses (analysis_id, user_id, chess_handle, game_mode, end_date, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let analysis = sqlx::query_as::<_, Analysis>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&input.chess_handle)
            .bind(input.game_mode)
            .bind(input.end_date)
            .bind(AnalysisStatus::Pending)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO analysis_queue (analysis_id) VALUES ($1)")
            .bind(analysis.analysis_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(analysis)
    }

    async fn find_by_id(&self, analysis_id: Uuid) -> Result<Analysis> {
        let query = format!("SELECT {COLUMNS} FROM analyses WHERE analysis_id = $1");
        sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn find_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Analysis> {
        let query =
            format!("SELECT {COLUMNS} FROM analyses WHERE analysis_id = $1 AND user_id = $2");
        sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Analysis>> {
        let query = format!(
            "SELECT {COLUMNS} FROM analyses WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let analyses = sqlx::query_as::<_, Analysis>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(analyses)
    }

    async fn opponents(&self, analysis_id: Uuid) -> Result<Vec<OpponentRating>> {
        let opponents = sqlx::query_as::<_, OpponentRating>(
            r#"
            SELECT opponent_rating_id, analysis_id, opponent_handle, current_rating, created_at
            FROM opponent_ratings
            WHERE analysis_id = $1
            ORDER BY current_rating DESC, opponent_handle
            "#,
        )
        .bind(analysis_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(opponents)
    }

    async fn begin_processing(&self, analysis_id: Uuid) -> Result<Analysis> {
        let query = format!(
            "UPDATE analyses SET status = $2, updated_at = NOW() \
             WHERE analysis_id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .bind(AnalysisStatus::Processing)
            .bind(AnalysisStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(analysis) => Ok(analysis),
            None => Err(self
                .transition_error(analysis_id, AnalysisStatus::Processing)
                .await),
        }
    }

    async fn complete(&self, analysis_id: Uuid, outcome: &CompletedAnalysis) -> Result<Analysis> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "UPDATE analyses \
             SET status = $2, user_current_rating = $3, user_position_in_ranking = $4, \
                 total_opponents = $5, percentile = $6, completed_at = NOW(), updated_at = NOW() \
             WHERE analysis_id = $1 AND status = $7 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .bind(AnalysisStatus::Completed)
            .bind(outcome.user_current_rating)
            .bind(outcome.ranking.position_in_ranking)
            .bind(outcome.ranking.total_opponents)
            .bind(outcome.ranking.percentile)
            .bind(AnalysisStatus::Processing)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(analysis) = updated else {
            tx.rollback().await?;
            return Err(self
                .transition_error(analysis_id, AnalysisStatus::Completed)
                .await);
        };

        for opponent in &outcome.opponents {
            sqlx::query(
                r#"
                INSERT INTO opponent_ratings (opponent_rating_id, analysis_id, opponent_handle, current_rating)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(analysis_id)
            .bind(&opponent.opponent_handle)
            .bind(opponent.current_rating)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let error = StorageError::from(e);
                if error.is_unique_violation() {
                    StorageError::ConstraintViolation(format!(
                        "opponent '{}' recorded twice",
                        opponent.opponent_handle
                    ))
                } else {
                    error
                }
            })?;
        }

        tx.commit().await?;

        Ok(analysis)
    }

    async fn fail(&self, analysis_id: Uuid, message: &str) -> Result<Analysis> {
        let query = format!(
            "UPDATE analyses \
             SET status = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE analysis_id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .bind(AnalysisStatus::Failed)
            .bind(message)
            .bind(AnalysisStatus::Processing)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(analysis) => Ok(analysis),
            None => Err(self.transition_error(analysis_id, AnalysisStatus::Failed).await),
        }
    }

    async fn mark_paid(&self, analysis_id: Uuid, payment_reference: Option<&str>) -> Result<Analysis> {
        let query = format!(
            "UPDATE analyses \
             SET is_paid = TRUE, payment_reference = COALESCE($2, payment_reference), updated_at = NOW() \
             WHERE analysis_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Analysis>(&query)
            .bind(analysis_id)
            .bind(payment_reference)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }
}
