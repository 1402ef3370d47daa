use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::dto::analysis::{AnalysisStatusResponse, MarkPaidRequest};
use uuid::Uuid;
use validator::Validate;

use super::services;
use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/admin/analyses/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Analysis id")
    ),
    request_body = MarkPaidRequest,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Analysis marked as paid", body = AnalysisStatusResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found")
    ),
    tag = "admin"
)]
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkPaidRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let analysis = services::mark_paid(state.analyses.as_ref(), id, &req).await?;
    tracing::info!(analysis_id = %id, "Analysis marked as paid");

    Ok(Json(AnalysisStatusResponse::from(analysis)).into_response())
}
