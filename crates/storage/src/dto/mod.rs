pub mod analysis;
pub mod auth;
