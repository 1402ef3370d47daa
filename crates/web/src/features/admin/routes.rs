use axum::{Router, middleware, routing::post};

use super::handlers::mark_paid;
use crate::middleware::auth::{ApiKeys, require_api_key};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/analyses/:id/payment", post(mark_paid))
        .route_layer(middleware::from_fn_with_state(api_keys, require_api_key))
}
