use axum::{Router, routing::get};

use super::handlers::{
    create_analysis, get_analysis, get_analysis_status, get_opponents, list_analyses,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_analyses).post(create_analysis))
        .route("/:id", get(get_analysis))
        .route("/:id/status", get(get_analysis_status))
        .route("/:id/opponents", get(get_opponents))
}
