use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta, Utc};
use provider::{OpponentResolver, ProviderError, RatingFetcher};
use storage::StorageError;
use storage::models::{
    Analysis, AnalysisStatus, ChessHandle, CompletedAnalysis, GameMode, NewOpponentRating,
};
use storage::repository::{AnalysisRepository, RatingCache};
use storage::services::ranking::compute_ranking;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backoff::{RetryError, RetryPolicy, retry};
use crate::error::Result;

/// Why an analysis ended in `failed`. The `Display` output is what users see
/// as the analysis error message.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    UnknownHandle(String),
    ProviderUnavailable { attempts: u32, detail: String },
    ProviderRejected(String),
    NoComparableOpponents { handle: String, end_date: NaiveDate },
    Storage,
    Interrupted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandle(handle) => {
                write!(f, "chess handle '{handle}' was not found on the provider")
            }
            Self::ProviderUnavailable { attempts, detail } => write!(
                f,
                "rating provider unavailable after {attempts} attempts: {detail}"
            ),
            Self::ProviderRejected(detail) => {
                write!(f, "rating provider returned an unusable response: {detail}")
            }
            Self::NoComparableOpponents { handle, end_date } => write!(
                f,
                "no comparable opponents found for '{handle}' up to {end_date}"
            ),
            Self::Storage => f.write_str("internal storage error while processing analysis"),
            Self::Interrupted => {
                f.write_str("analysis processing was interrupted before completion")
            }
        }
    }
}

/// Terminal result of one orchestrator execution.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Analysis),
    Failed(Analysis),
    /// The analysis was not `pending`; nothing was done.
    Skipped(AnalysisStatus),
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Cached ratings older than this are fetched again.
    pub cache_ttl: TimeDelta,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: TimeDelta::hours(24),
            retry: RetryPolicy::default(),
        }
    }
}

/// Turns a `pending` analysis into `completed` or `failed`.
///
/// Callers guarantee a given analysis is executed by at most one
/// orchestrator at a time; the queue lease provides that.
pub struct Orchestrator {
    analyses: Arc<dyn AnalysisRepository>,
    cache: Arc<dyn RatingCache>,
    resolver: Arc<dyn OpponentResolver>,
    fetcher: Arc<dyn RatingFetcher>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        analyses: Arc<dyn AnalysisRepository>,
        cache: Arc<dyn RatingCache>,
        resolver: Arc<dyn OpponentResolver>,
        fetcher: Arc<dyn RatingFetcher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            analyses,
            cache,
            resolver,
            fetcher,
            config,
        }
    }

    /// Executes one analysis end to end.
    ///
    /// Returns an error only when even recording the failure could not be
    /// stored; the analysis is then left `processing` for redelivery.
    pub async fn run(&self, analysis_id: Uuid) -> Result<JobOutcome> {
        let analysis = match self.analyses.begin_processing(analysis_id).await {
            Ok(analysis) => analysis,
            Err(StorageError::InvalidTransition { from, .. }) => {
                warn!(%analysis_id, status = %from, "Analysis is not pending, skipping");
                return Ok(JobOutcome::Skipped(from));
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            %analysis_id,
            handle = %analysis.chess_handle,
            game_mode = %analysis.game_mode,
            end_date = %analysis.end_date,
            "Processing analysis"
        );

        let outcome = match self.evaluate(&analysis).await {
            Ok(outcome) => outcome,
            Err(reason) => return self.fail(analysis_id, reason).await,
        };

        match self.analyses.complete(analysis_id, &outcome).await {
            Ok(completed) => {
                info!(
                    %analysis_id,
                    position = outcome.ranking.position_in_ranking,
                    total_opponents = outcome.ranking.total_opponents,
                    percentile = outcome.ranking.percentile,
                    "Analysis completed"
                );
                Ok(JobOutcome::Completed(completed))
            }
            Err(e) => {
                error!(%analysis_id, error = %e, "Failed to store analysis results");
                self.fail(analysis_id, FailureReason::Storage).await
            }
        }
    }

    /// Moves a `processing` analysis to `failed` with `reason`.
    pub async fn fail(&self, analysis_id: Uuid, reason: FailureReason) -> Result<JobOutcome> {
        warn!(%analysis_id, reason = %reason, "Analysis failed");
        let failed = self.analyses.fail(analysis_id, &reason.to_string()).await?;
        Ok(JobOutcome::Failed(failed))
    }

    async fn evaluate(
        &self,
        analysis: &Analysis,
    ) -> std::result::Result<CompletedAnalysis, FailureReason> {
        let handle = ChessHandle::new(&analysis.chess_handle);
        let mode = analysis.game_mode;

        let opponents = self
            .resolve_opponents(&handle, mode, analysis.end_date)
            .await?;

        let mut rated = Vec::with_capacity(opponents.len());
        let mut excluded = 0usize;
        for opponent in opponents {
            match self.rating_for(&opponent, mode).await? {
                Some(rating) => rated.push(NewOpponentRating {
                    opponent_handle: opponent.into_inner(),
                    current_rating: rating,
                }),
                None => {
                    debug!(opponent = %opponent, "Opponent has no rating, excluding");
                    excluded += 1;
                }
            }
        }

        if excluded > 0 {
            info!(
                analysis_id = %analysis.analysis_id,
                excluded,
                included = rated.len(),
                "Excluded opponents without a rating"
            );
        }

        let ratings: Vec<i32> = rated.iter().map(|o| o.current_rating).collect();
        if ratings.is_empty() {
            return Err(FailureReason::NoComparableOpponents {
                handle: handle.into_inner(),
                end_date: analysis.end_date,
            });
        }

        let user_rating = self
            .rating_for(&handle, mode)
            .await?
            .ok_or_else(|| FailureReason::UnknownHandle(handle.to_string()))?;

        let ranking = compute_ranking(user_rating, &ratings).ok_or_else(|| {
            FailureReason::NoComparableOpponents {
                handle: handle.to_string(),
                end_date: analysis.end_date,
            }
        })?;

        Ok(CompletedAnalysis {
            user_current_rating: user_rating,
            ranking,
            opponents: rated,
        })
    }

    /// Distinct opponents in canonical form, never including the player.
    async fn resolve_opponents(
        &self,
        handle: &ChessHandle,
        mode: GameMode,
        end_date: NaiveDate,
    ) -> std::result::Result<BTreeSet<ChessHandle>, FailureReason> {
        let resolver = &self.resolver;
        let subject = handle.as_str();

        let raw = retry(&self.config.retry, move || {
            resolver.resolve_opponents(subject, mode, end_date)
        })
        .await
        .map_err(|e| match e {
            RetryError::Permanent(ProviderError::UnknownPlayer(_)) => {
                FailureReason::UnknownHandle(handle.to_string())
            }
            other => provider_failure(other),
        })?;

        let resolved = raw.len();
        let opponents: BTreeSet<ChessHandle> = raw
            .iter()
            .map(ChessHandle::new)
            .filter(|opponent| !opponent.is_empty() && opponent != handle)
            .collect();
        debug!(resolved, distinct = opponents.len(), "Resolved opponents");

        Ok(opponents)
    }

    /// Cache first, then the fetcher; fetched ratings are written back.
    async fn rating_for(
        &self,
        handle: &ChessHandle,
        mode: GameMode,
    ) -> std::result::Result<Option<i32>, FailureReason> {
        match self.cache.get(handle.as_str(), mode).await {
            Ok(Some(cached)) if !cached.is_stale(self.config.cache_ttl, Utc::now()) => {
                return Ok(Some(cached.rating));
            }
            Ok(_) => {}
            Err(e) => return Err(storage_failure(e)),
        }

        let fetcher = &self.fetcher;
        let subject = handle.as_str();
        let fetched = match retry(&self.config.retry, move || fetcher.fetch_rating(subject, mode))
            .await
        {
            Ok(rating) => rating,
            Err(RetryError::Permanent(ProviderError::UnknownPlayer(_))) => None,
            Err(e) => return Err(provider_failure(e)),
        };

        if let Some(rating) = fetched {
            self.cache
                .put(handle.as_str(), mode, rating)
                .await
                .map_err(storage_failure)?;
        }

        Ok(fetched)
    }
}

fn provider_failure(err: RetryError) -> FailureReason {
    match err {
        RetryError::Exhausted { attempts, last } => FailureReason::ProviderUnavailable {
            attempts,
            detail: last.to_string(),
        },
        RetryError::Permanent(e) => FailureReason::ProviderRejected(e.to_string()),
    }
}

fn storage_failure(err: StorageError) -> FailureReason {
    error!(error = %err, "Storage error while processing analysis");
    FailureReason::Storage
}
