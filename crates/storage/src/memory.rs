//! In-memory implementation of every repository trait.
//!
//! Not durable. One mutex guards all aggregates, which makes every
//! operation linearizable and lets `complete` write results and opponents
//! atomically. Used by tests and local runs without Postgres.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{
    Analysis, CachedRating, CompletedAnalysis, GameMode, NewAnalysis, NewUser, OpponentRating,
    QueueClaim, Session, User, generate_token,
};
use crate::repository::{AnalysisRepository, JobQueue, RatingCache, SessionStore, UserRepository};

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    analyses: HashMap<Uuid, Analysis>,
    opponents: HashMap<Uuid, Vec<OpponentRating>>,
    cache: HashMap<(String, GameMode), CachedRating>,
    queue: HashMap<Uuid, QueueEntry>,
    queue_seq: u64,
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
}

impl Inner {
    /// Appends a fresh, unclaimed entry behind everything already queued.
    fn push_queue(&mut self, analysis_id: Uuid) {
        self.queue_seq += 1;
        self.queue.insert(
            analysis_id,
            QueueEntry {
                seq: self.queue_seq,
                claimed_by: None,
                lease_expires_at: None,
                deliveries: 0,
            },
        );
    }
}

struct QueueEntry {
    seq: u64,
    claimed_by: Option<String>,
    lease_expires_at: Option<DateTime<Utc>>,
    deliveries: i32,
}

impl QueueEntry {
    fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.lease_expires_at.is_none_or(|expires| expires < now)
    }

    fn is_held_by(&self, claim: &QueueClaim) -> bool {
        self.claimed_by.as_deref() == Some(claim.claimed_by.as_str())
            && self.deliveries == claim.deliveries
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of entries waiting in or claimed from the queue.
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    fn with_analysis<F>(&self, analysis_id: Uuid, update: F) -> Result<Analysis>
    where
        F: FnOnce(&mut Inner, &mut Analysis) -> Result<()>,
    {
        let mut inner = self.lock();
        let mut analysis = inner
            .analyses
            .get(&analysis_id)
            .cloned()
            .ok_or(StorageError::NotFound)?;
        update(&mut *inner, &mut analysis)?;
        inner.analyses.insert(analysis_id, analysis.clone());
        Ok(analysis)
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryStore {
    async fn create(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis> {
        let analysis = Analysis::new(user_id, input, Utc::now());
        self.lock()
            .analyses
            .insert(analysis.analysis_id, analysis.clone());
        Ok(analysis)
    }

    async fn create_queued(&self, user_id: Uuid, input: &NewAnalysis) -> Result<Analysis> {
        let analysis = Analysis::new(user_id, input, Utc::now());
        let mut inner = self.lock();
        inner
            .analyses
            .insert(analysis.analysis_id, analysis.clone());
        inner.push_queue(analysis.analysis_id);
        Ok(analysis)
    }

    async fn find_by_id(&self, analysis_id: Uuid) -> Result<Analysis> {
        self.lock()
            .analyses
            .get(&analysis_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Analysis> {
        self.lock()
            .analyses
            .get(&analysis_id)
            .filter(|analysis| analysis.user_id == user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> = self
            .lock()
            .analyses
            .values()
            .filter(|analysis| analysis.user_id == user_id)
            .cloned()
            .collect();
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(analyses)
    }

    async fn opponents(&self, analysis_id: Uuid) -> Result<Vec<OpponentRating>> {
        let mut opponents = self
            .lock()
            .opponents
            .get(&analysis_id)
            .cloned()
            .unwrap_or_default();
        opponents.sort_by(|a, b| {
            b.current_rating
                .cmp(&a.current_rating)
                .then_with(|| a.opponent_handle.cmp(&b.opponent_handle))
        });
        Ok(opponents)
    }

    async fn begin_processing(&self, analysis_id: Uuid) -> Result<Analysis> {
        self.with_analysis(analysis_id, |_, analysis| {
            analysis.begin_processing(Utc::now())
        })
    }

    async fn complete(&self, analysis_id: Uuid, outcome: &CompletedAnalysis) -> Result<Analysis> {
        self.with_analysis(analysis_id, |inner, analysis| {
            let now = Utc::now();
            let mut rows: Vec<OpponentRating> = Vec::with_capacity(outcome.opponents.len());
            for opponent in &outcome.opponents {
                if rows
                    .iter()
                    .any(|row| row.opponent_handle == opponent.opponent_handle)
                {
                    return Err(StorageError::ConstraintViolation(format!(
                        "opponent '{}' recorded twice",
                        opponent.opponent_handle
                    )));
                }
                rows.push(OpponentRating {
                    opponent_rating_id: Uuid::new_v4(),
                    analysis_id,
                    opponent_handle: opponent.opponent_handle.clone(),
                    current_rating: opponent.current_rating,
                    created_at: now,
                });
            }

            analysis.complete(outcome, now)?;
            inner.opponents.insert(analysis_id, rows);
            Ok(())
        })
    }

    async fn fail(&self, analysis_id: Uuid, message: &str) -> Result<Analysis> {
        self.with_analysis(analysis_id, |_, analysis| analysis.fail(message, Utc::now()))
    }

    async fn mark_paid(&self, analysis_id: Uuid, payment_reference: Option<&str>) -> Result<Analysis> {
        self.with_analysis(analysis_id, |_, analysis| {
            analysis.is_paid = true;
            if let Some(reference) = payment_reference {
                analysis.payment_reference = Some(reference.to_string());
            }
            analysis.updated_at = Utc::now();
            Ok(())
        })
    }
}

#[async_trait]
impl RatingCache for InMemoryStore {
    async fn get(&self, handle: &str, game_mode: GameMode) -> Result<Option<CachedRating>> {
        Ok(self
            .lock()
            .cache
            .get(&(handle.to_string(), game_mode))
            .cloned())
    }

    async fn put(&self, handle: &str, game_mode: GameMode, rating: i32) -> Result<CachedRating> {
        let entry = CachedRating {
            handle: handle.to_string(),
            game_mode,
            rating,
            cached_at: Utc::now(),
        };
        self.lock()
            .cache
            .insert((handle.to_string(), game_mode), entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl JobQueue for InMemoryStore {
    async fn enqueue(&self, analysis_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        if !inner.queue.contains_key(&analysis_id) {
            inner.push_queue(analysis_id);
        }
        Ok(())
    }

    async fn claim(&self, worker_id: &str, lease: Duration) -> Result<Option<QueueClaim>> {
        let now = Utc::now();
        let lease = TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX);
        let mut inner = self.lock();

        let next = inner
            .queue
            .iter()
            .filter(|(_, entry)| entry.is_claimable(now))
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(id, _)| *id);

        let Some(analysis_id) = next else {
            return Ok(None);
        };
        let Some(entry) = inner.queue.get_mut(&analysis_id) else {
            return Ok(None);
        };

        let expires = now.checked_add_signed(lease).unwrap_or(DateTime::<Utc>::MAX_UTC);
        entry.claimed_by = Some(worker_id.to_string());
        entry.lease_expires_at = Some(expires);
        entry.deliveries += 1;

        Ok(Some(QueueClaim {
            analysis_id,
            claimed_by: worker_id.to_string(),
            deliveries: entry.deliveries,
            lease_expires_at: expires,
        }))
    }

    async fn ack(&self, claim: &QueueClaim) -> Result<bool> {
        let mut inner = self.lock();
        let held = inner
            .queue
            .get(&claim.analysis_id)
            .is_some_and(|entry| entry.is_held_by(claim));
        if held {
            inner.queue.remove(&claim.analysis_id);
        }
        Ok(held)
    }

    async fn extend_lease(&self, claim: &QueueClaim, lease: Duration) -> Result<bool> {
        let lease = TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX);
        let mut inner = self.lock();
        match inner.queue.get_mut(&claim.analysis_id) {
            Some(entry) if entry.is_held_by(claim) => {
                let expires = Utc::now()
                    .checked_add_signed(lease)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                entry.lease_expires_at = Some(expires);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn requeue_unfinished(&self) -> Result<u64> {
        let mut inner = self.lock();
        let mut unfinished: Vec<(DateTime<Utc>, Uuid)> = inner
            .analyses
            .values()
            .filter(|analysis| !analysis.status.is_terminal())
            .filter(|analysis| !inner.queue.contains_key(&analysis.analysis_id))
            .map(|analysis| (analysis.created_at, analysis.analysis_id))
            .collect();
        unfinished.sort();

        for (_, analysis_id) in &unfinished {
            inner.push_queue(*analysis_id);
        }
        Ok(unfinished.len() as u64)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, input: &NewUser) -> Result<User> {
        let mut inner = self.lock();
        if inner
            .users
            .values()
            .any(|user| user.username == input.username)
        {
            return Err(StorageError::ConstraintViolation(
                "A user with that username already exists".to_string(),
            ));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            created_at: Utc::now(),
        };
        inner.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.lock()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<User> {
        self.lock()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, user_id: Uuid) -> Result<Session> {
        let session = Session {
            token: generate_token(),
            user_id,
            created_at: Utc::now(),
        };
        self.lock()
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>> {
        Ok(self.lock().sessions.get(token).map(|session| session.user_id))
    }

    async fn revoke(&self, token: &str) -> Result<bool> {
        Ok(self.lock().sessions.remove(token).is_some())
    }
}
