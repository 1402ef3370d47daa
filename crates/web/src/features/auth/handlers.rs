use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::auth::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UserProfile};
use validator::Validate;

use super::services;
use crate::error::WebError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username already taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let (user, session) =
        services::register(state.users.as_ref(), state.sessions.as_ref(), &req).await?;
    tracing::info!(user_id = %user.user_id, "User registered");

    let response = AuthResponse {
        user: UserProfile::from(user),
        token: session.token,
        message: "User created successfully".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let (user, session) =
        services::login(state.users.as_ref(), state.sessions.as_ref(), &req).await?;

    let response = AuthResponse {
        user: UserProfile::from(user),
        token: session.token,
        message: "Login successful".to_string(),
    };
    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<Response, WebError> {
    services::logout(state.sessions.as_ref(), &user.token).await?;

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn profile(State(state): State<AppState>, user: AuthUser) -> Result<Response, WebError> {
    let user = services::profile(state.users.as_ref(), user.user_id).await?;

    Ok(Json(UserProfile::from(user)).into_response())
}
