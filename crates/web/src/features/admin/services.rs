use storage::dto::analysis::MarkPaidRequest;
use storage::error::Result;
use storage::models::Analysis;
use storage::repository::AnalysisRepository;
use uuid::Uuid;

/// Record an external payment. Paying twice keeps the first reference
/// unless a new one is given.
pub async fn mark_paid(
    analyses: &dyn AnalysisRepository,
    analysis_id: Uuid,
    request: &MarkPaidRequest,
) -> Result<Analysis> {
    let reference = request
        .payment_reference
        .as_deref()
        .map(str::trim)
        .filter(|reference| !reference.is_empty());

    analyses.mark_paid(analysis_id, reference).await
}
