pub mod admin;
pub mod analyses;
pub mod auth;
