use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::features::{admin, analyses, auth};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Full application router with Swagger UI, CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes::routes())
        .nest("/analyses", analyses::routes::routes())
        .nest("/admin", admin::routes::routes(state.api_keys.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
