use storage::dto::analysis::CreateAnalysisRequest;
use storage::error::Result;
use storage::models::{Analysis, OpponentRating};
use storage::repository::AnalysisRepository;
use uuid::Uuid;

/// Store a new `pending` analysis together with its queue entry.
pub async fn create_analysis(
    analyses: &dyn AnalysisRepository,
    user_id: Uuid,
    request: &CreateAnalysisRequest,
) -> Result<Analysis> {
    analyses
        .create_queued(user_id, &request.to_new_analysis())
        .await
}

/// The caller's analyses with their opponents, newest first.
pub async fn list_analyses(
    analyses: &dyn AnalysisRepository,
    user_id: Uuid,
) -> Result<Vec<(Analysis, Vec<OpponentRating>)>> {
    let owned = analyses.list_for_user(user_id).await?;

    let mut detailed = Vec::with_capacity(owned.len());
    for analysis in owned {
        let opponents = analyses.opponents(analysis.analysis_id).await?;
        detailed.push((analysis, opponents));
    }
    Ok(detailed)
}

/// Fails with `NotFound` when the analysis belongs to someone else.
pub async fn get_analysis(
    analyses: &dyn AnalysisRepository,
    user_id: Uuid,
    analysis_id: Uuid,
) -> Result<Analysis> {
    analyses.find_for_user(user_id, analysis_id).await
}

pub async fn get_analysis_with_opponents(
    analyses: &dyn AnalysisRepository,
    user_id: Uuid,
    analysis_id: Uuid,
) -> Result<(Analysis, Vec<OpponentRating>)> {
    let analysis = analyses.find_for_user(user_id, analysis_id).await?;
    let opponents = analyses.opponents(analysis_id).await?;
    Ok((analysis, opponents))
}
