use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{login, logout, profile, register};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}
