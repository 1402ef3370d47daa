use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;
use provider::sources::chesscom::DEFAULT_BASE_URL;
use worker::{DispatcherConfig, OrchestratorConfig, RetryPolicy};

use crate::payment::PaymentPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_keys: String,
    pub chess_api_base_url: String,
    pub provider_min_interval: Duration,
    pub cache_ttl: TimeDelta,
    pub worker_concurrency: usize,
    pub worker_poll_interval: Duration,
    pub worker_lease: Duration,
    pub retry: RetryPolicy,
    pub payment_policy: PaymentPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |key: &str, default: &str| -> Result<u64> {
            parse_or(&lookup, key, default)
        };

        Ok(Self {
            host: lookup("HOST").context("Cannot load HOST env variable")?,
            port: lookup("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: lookup("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            api_keys: lookup("API_KEYS").unwrap_or_default(),
            chess_api_base_url: lookup("CHESS_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            provider_min_interval: Duration::from_millis(parsed("PROVIDER_MIN_INTERVAL_MS", "250")?),
            cache_ttl: TimeDelta::try_hours(parse_or(&lookup, "CACHE_TTL_HOURS", "24")?)
                .context("CACHE_TTL_HOURS is out of range")?,
            worker_concurrency: parse_or(&lookup, "WORKER_CONCURRENCY", "4")?,
            worker_poll_interval: Duration::from_millis(parsed("WORKER_POLL_INTERVAL_MS", "1000")?),
            worker_lease: Duration::from_secs(parsed("WORKER_LEASE_SECS", "600")?),
            retry: RetryPolicy::new(
                parse_or(&lookup, "RETRY_MAX_ATTEMPTS", "3")?,
                Duration::from_millis(parsed("RETRY_BASE_DELAY_MS", "500")?),
            ),
            payment_policy: parse_or(&lookup, "PAYMENT_GATING", "disabled")?,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: self.cache_ttl,
            retry: self.retry,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            concurrency: self.worker_concurrency,
            poll_interval: self.worker_poll_interval,
            lease: self.worker_lease,
            ..DispatcherConfig::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}"))
}
