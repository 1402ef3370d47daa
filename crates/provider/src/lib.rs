pub mod error;
pub mod sources;
pub mod throttle;
pub mod traits;

pub use error::{ProviderError, Result};
pub use sources::chesscom::ChessComClient;
pub use throttle::RateLimiter;
pub use traits::{OpponentResolver, RatingFetcher};
