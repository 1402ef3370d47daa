use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::analysis::{
    AnalysisResponse, AnalysisStatusResponse, CreateAnalysisRequest, CreateAnalysisResponse,
    OpponentsResponse,
};
use uuid::Uuid;
use validator::Validate;

use super::services;
use crate::error::WebError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/analyses",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Analyses of the current user, newest first", body = Vec<AnalysisResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "analyses"
)]
pub async fn list_analyses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, WebError> {
    let analyses = services::list_analyses(state.analyses.as_ref(), user.user_id).await?;

    let response: Vec<AnalysisResponse> = analyses
        .into_iter()
        .map(|(analysis, opponents)| {
            let withheld = state.payment_policy.withholds(&analysis);
            AnalysisResponse::new(analysis, opponents, withheld)
        })
        .collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/analyses",
    request_body = CreateAnalysisRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Analysis accepted and queued", body = CreateAnalysisResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "analyses"
)]
pub async fn create_analysis(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateAnalysisRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let analysis =
        services::create_analysis(state.analyses.as_ref(), user.user_id, &req).await?;
    tracing::info!(
        analysis_id = %analysis.analysis_id,
        user_id = %user.user_id,
        handle = %analysis.chess_handle,
        "Analysis queued"
    );

    Ok((StatusCode::CREATED, Json(CreateAnalysisResponse::from(analysis))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/analyses/{id}",
    params(
        ("id" = Uuid, Path, description = "Analysis id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Analysis with its opponents", body = AnalysisResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found")
    ),
    tag = "analyses"
)]
pub async fn get_analysis(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let (analysis, opponents) =
        services::get_analysis_with_opponents(state.analyses.as_ref(), user.user_id, id).await?;
    let withheld = state.payment_policy.withholds(&analysis);

    Ok(Json(AnalysisResponse::new(analysis, opponents, withheld)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/analyses/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Analysis id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current status and progress", body = AnalysisStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found")
    ),
    tag = "analyses"
)]
pub async fn get_analysis_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let analysis = services::get_analysis(state.analyses.as_ref(), user.user_id, id).await?;

    Ok(Json(AnalysisStatusResponse::from(analysis)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/analyses/{id}/opponents",
    params(
        ("id" = Uuid, Path, description = "Analysis id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ranking and opponent ratings", body = OpponentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Analysis not found")
    ),
    tag = "analyses"
)]
pub async fn get_opponents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let (analysis, opponents) =
        services::get_analysis_with_opponents(state.analyses.as_ref(), user.user_id, id).await?;
    let withheld = state.payment_policy.withholds(&analysis);

    Ok(Json(OpponentsResponse::new(analysis, opponents, withheld)).into_response())
}
