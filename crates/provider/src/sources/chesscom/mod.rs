mod client;
mod models;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use storage::models::GameMode;
use tracing::{debug, info};

pub use client::{ChessComApi, DEFAULT_BASE_URL};
pub use models::*;

use crate::error::{ProviderError, Result};
use crate::throttle::RateLimiter;
use crate::traits::{OpponentResolver, RatingFetcher};

/// chess.com adapter implementing both provider contracts.
///
/// Opponents come from the player's monthly game archives; ratings come
/// from the `last` rating of the matching mode in the player's stats.
pub struct ChessComClient {
    api: ChessComApi,
}

impl ChessComClient {
    pub fn new(base_url: impl Into<String>, limiter: Arc<RateLimiter>) -> Result<Self> {
        Ok(Self {
            api: ChessComApi::new(base_url, limiter)?,
        })
    }
}

#[async_trait::async_trait]
impl OpponentResolver for ChessComClient {
    async fn resolve_opponents(
        &self,
        handle: &str,
        game_mode: GameMode,
        end_date: NaiveDate,
    ) -> Result<Vec<String>> {
        let handle = handle.trim().to_lowercase();
        let archives = self
            .api
            .archives(&handle)
            .await?
            .ok_or_else(|| ProviderError::UnknownPlayer(handle.clone()))?;

        let months: Vec<(i32, u32)> = archives
            .iter()
            .filter_map(|url| archive_month(url))
            .filter(|month| month_within(*month, end_date))
            .collect();
        info!(handle = %handle, %game_mode, months = months.len(), "resolving opponents");

        let mut opponents = BTreeSet::new();
        for (year, month) in months {
            let games = self.api.monthly_games(&handle, year, month).await?;
            let before = opponents.len();
            opponents.extend(opponents_in(&games, &handle, game_mode, end_date));
            debug!(year, month, games = games.len(), new = opponents.len() - before, "archive scanned");
        }

        Ok(opponents.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl RatingFetcher for ChessComClient {
    async fn fetch_rating(&self, handle: &str, game_mode: GameMode) -> Result<Option<i32>> {
        let handle = handle.trim().to_lowercase();
        let stats = self.api.stats(&handle).await?;
        Ok(stats.and_then(|stats| stats.rating_for(game_mode)))
    }
}
