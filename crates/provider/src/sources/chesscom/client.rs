use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{ArchivesResponse, Game, MonthlyGames, PlayerStats};
use crate::error::{ProviderError, Result};
use crate::throttle::RateLimiter;

pub const DEFAULT_BASE_URL: &str = "https://api.chess.com/pub";

const USER_AGENT: &str = concat!("chess-rating-evolution/", env!("CARGO_PKG_VERSION"));

/// Thin HTTP client over the chess.com published-data API.
///
/// Every request waits on the shared [`RateLimiter`] first.
pub struct ChessComApi {
    base_url: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

impl ChessComApi {
    pub fn new(base_url: impl Into<String>, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            limiter,
        })
    }

    /// Monthly archive URLs of a player, `None` if the player does not exist.
    pub async fn archives(&self, handle: &str) -> Result<Option<Vec<String>>> {
        let url = format!("{}/player/{}/games/archives", self.base_url, handle);
        let response: Option<ArchivesResponse> = self.get_json(&url).await?;
        Ok(response.map(|body| body.archives))
    }

    /// Games a player finished in the given month.
    pub async fn monthly_games(&self, handle: &str, year: i32, month: u32) -> Result<Vec<Game>> {
        let url = format!(
            "{}/player/{}/games/{}/{:02}",
            self.base_url, handle, year, month
        );
        let response: Option<MonthlyGames> = self.get_json(&url).await?;
        Ok(response.map(|body| body.games).unwrap_or_default())
    }

    pub async fn stats(&self, handle: &str) -> Result<Option<PlayerStats>> {
        let url = format!("{}/player/{}/stats", self.base_url, handle);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        self.limiter.acquire().await;
        debug!(url, "requesting provider");

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            status if status.is_success() => {
                let body = response.bytes().await?;
                Ok(Some(serde_json::from_slice(&body)?))
            }
            status => Err(ProviderError::Unavailable(format!(
                "{url} answered {status}"
            ))),
        }
    }
}
