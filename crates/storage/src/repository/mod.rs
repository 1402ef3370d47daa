//! Persistence seams of the service.
//!
//! Every aggregate is reached through an async trait so the worker and the
//! HTTP layer can run against Postgres in production and against
//! [`crate::memory::InMemoryStore`] in tests.

pub mod analysis;
pub mod queue;
pub mod rating_cache;
pub mod session;
pub mod user;

pub use analysis::{AnalysisRepository, PgAnalysisRepository};
pub use queue::{JobQueue, PgJobQueue};
pub use rating_cache::{PgRatingCache, RatingCache};
pub use session::{PgSessionStore, SessionStore};
pub use user::{PgUserRepository, UserRepository};
