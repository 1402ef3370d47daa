#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use provider::{OpponentResolver, ProviderError, RatingFetcher};
use storage::memory::InMemoryStore;
use storage::models::{Analysis, GameMode, NewAnalysis};
use storage::repository::AnalysisRepository;
use uuid::Uuid;
use worker::{Orchestrator, OrchestratorConfig, RetryPolicy};

/// Scriptable stand-in for the rating provider.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    opponents: HashMap<String, Vec<String>>,
    ratings: HashMap<String, i32>,
    resolve_failures: VecDeque<ProviderError>,
    fetch_failures: VecDeque<ProviderError>,
    resolve_calls: usize,
    fetched: Vec<String>,
    fetch_delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opponents(self, handle: &str, opponents: &[&str]) -> Self {
        self.state.lock().unwrap().opponents.insert(
            handle.to_lowercase(),
            opponents.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    pub fn with_rating(self, handle: &str, rating: i32) -> Self {
        self.state
            .lock()
            .unwrap()
            .ratings
            .insert(handle.to_lowercase(), rating);
        self
    }

    pub fn failing_resolve(self, err: ProviderError) -> Self {
        self.state.lock().unwrap().resolve_failures.push_back(err);
        self
    }

    pub fn failing_fetch(self, err: ProviderError) -> Self {
        self.state.lock().unwrap().fetch_failures.push_back(err);
        self
    }

    /// Every rating fetch takes `delay` before answering.
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().fetch_delay = Some(delay);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }
}

#[async_trait]
impl OpponentResolver for FakeProvider {
    async fn resolve_opponents(
        &self,
        handle: &str,
        _game_mode: GameMode,
        _end_date: NaiveDate,
    ) -> provider::Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.resolve_calls += 1;
        if let Some(err) = state.resolve_failures.pop_front() {
            return Err(err);
        }
        state
            .opponents
            .get(&handle.to_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::UnknownPlayer(handle.to_string()))
    }
}

#[async_trait]
impl RatingFetcher for FakeProvider {
    async fn fetch_rating(&self, handle: &str, _game_mode: GameMode) -> provider::Result<Option<i32>> {
        let delay = self.state.lock().unwrap().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fetch_failures.pop_front() {
            return Err(err);
        }
        state.fetched.push(handle.to_string());
        Ok(state.ratings.get(&handle.to_lowercase()).copied())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        cache_ttl: TimeDelta::hours(24),
        retry: RetryPolicy::immediate(3),
    }
}

pub fn harness(provider: FakeProvider) -> Harness {
    harness_with(provider, test_config())
}

pub fn harness_with(provider: FakeProvider, config: OrchestratorConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(provider);
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        store.clone(),
        provider.clone(),
        provider.clone(),
        config,
    ));
    Harness {
        store,
        provider,
        orchestrator,
    }
}

pub fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

pub async fn pending_analysis(store: &InMemoryStore, handle: &str) -> Analysis {
    AnalysisRepository::create(
        store,
        Uuid::new_v4(),
        &NewAnalysis {
            chess_handle: handle.to_string(),
            game_mode: GameMode::Blitz,
            end_date: end_date(),
        },
    )
    .await
    .unwrap()
}

pub async fn reload(store: &InMemoryStore, analysis_id: Uuid) -> Analysis {
    AnalysisRepository::find_by_id(store, analysis_id).await.unwrap()
}
