pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod openapi;
pub mod payment;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
