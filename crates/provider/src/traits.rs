use chrono::NaiveDate;
use storage::models::GameMode;

use crate::Result;

/// Finds who a player faced.
///
/// Implementations must be idempotent: the same arguments against the same
/// provider state yield the same set.
#[async_trait::async_trait]
pub trait OpponentResolver: Send + Sync {
    /// Distinct handles the player met in `game_mode` games that ended on or
    /// before `end_date`. Fails with [`crate::ProviderError::UnknownPlayer`]
    /// when the handle itself does not exist.
    async fn resolve_opponents(
        &self,
        handle: &str,
        game_mode: GameMode,
        end_date: NaiveDate,
    ) -> Result<Vec<String>>;
}

/// Looks up a player's current rating.
#[async_trait::async_trait]
pub trait RatingFetcher: Send + Sync {
    /// `Ok(None)` when the player does not exist or holds no rating in that mode.
    async fn fetch_rating(&self, handle: &str, game_mode: GameMode) -> Result<Option<i32>>;
}
