use std::sync::Arc;

use sqlx::PgPool;
use storage::memory::InMemoryStore;
use storage::repository::{
    AnalysisRepository, PgAnalysisRepository, PgSessionStore, PgUserRepository, SessionStore,
    UserRepository,
};

use crate::middleware::auth::ApiKeys;
use crate::payment::PaymentPolicy;

/// Shared handler state. Repositories sit behind trait objects so the same
/// router serves Postgres in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    pub analyses: Arc<dyn AnalysisRepository>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub payment_policy: PaymentPolicy,
    pub api_keys: ApiKeys,
}

impl AppState {
    pub fn postgres(pool: PgPool, payment_policy: PaymentPolicy, api_keys: ApiKeys) -> Self {
        Self {
            analyses: Arc::new(PgAnalysisRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool)),
            payment_policy,
            api_keys,
        }
    }

    pub fn in_memory(
        store: Arc<InMemoryStore>,
        payment_policy: PaymentPolicy,
        api_keys: ApiKeys,
    ) -> Self {
        Self {
            analyses: store.clone(),
            users: store.clone(),
            sessions: store,
            payment_policy,
            api_keys,
        }
    }
}
