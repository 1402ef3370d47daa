use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{CachedRating, GameMode};

/// Last-write-wins store of ratings keyed by (handle, game mode).
///
/// Entries are never expired here; freshness is the caller's decision.
#[async_trait]
pub trait RatingCache: Send + Sync {
    async fn get(&self, handle: &str, game_mode: GameMode) -> Result<Option<CachedRating>>;

    /// Upsert the rating and refresh its timestamp.
    async fn put(&self, handle: &str, game_mode: GameMode, rating: i32) -> Result<CachedRating>;
}

#[derive(Clone)]
pub struct PgRatingCache {
    pool: PgPool,
}

impl PgRatingCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingCache for PgRatingCache {
    async fn get(&self, handle: &str, game_mode: GameMode) -> Result<Option<CachedRating>> {
        let cached = sqlx::query_as::<_, CachedRating>(
            r#"
            SELECT handle, game_mode, rating, cached_at
            FROM rating_cache
            WHERE handle = $1 AND game_mode = $2
            "#,
        )
        .bind(handle)
        .bind(game_mode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cached)
    }

    async fn put(&self, handle: &str, game_mode: GameMode, rating: i32) -> Result<CachedRating> {
        let cached = sqlx::query_as::<_, CachedRating>(
            r#"
            INSERT INTO rating_cache (handle, game_mode, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle, game_mode)
            DO UPDATE SET
                rating = EXCLUDED.rating,
                cached_at = NOW()
            RETURNING handle, game_mode, rating, cached_at
            "#,
        )
        .bind(handle)
        .bind(game_mode)
        .bind(rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(cached)
    }
}
