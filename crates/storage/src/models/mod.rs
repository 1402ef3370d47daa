mod analysis;
mod handle;
mod opponent_rating;
mod queue;
mod rating_cache;
mod session;
mod user;

pub use analysis::{
    Analysis, AnalysisStatus, CompletedAnalysis, GameMode, NewAnalysis, PROCESSING_PROGRESS,
};
pub use handle::ChessHandle;
pub use opponent_rating::{NewOpponentRating, OpponentRating};
pub use queue::QueueClaim;
pub use rating_cache::CachedRating;
pub use session::{Session, generate_token};
pub use user::{NewUser, User};
