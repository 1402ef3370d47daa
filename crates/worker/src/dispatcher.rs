//! Queue consumer.
//!
//! Polls the [`JobQueue`] every `poll_interval`, claims entries under a
//! lease, and runs up to `concurrency` analyses at once. The lease is
//! renewed while an analysis runs. A claim is acked once its analysis is
//! terminal; any storage failure leaves the claim to expire so the entry is
//! delivered again.

use std::sync::Arc;
use std::time::Duration;

use storage::StorageError;
use storage::models::{AnalysisStatus, QueueClaim};
use storage::repository::{AnalysisRepository, JobQueue};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::orchestrator::{FailureReason, JobOutcome, Orchestrator};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub lease: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4().simple()),
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
            lease: Duration::from_secs(600),
        }
    }
}

pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    analyses: Arc<dyn AnalysisRepository>,
    orchestrator: Arc<Orchestrator>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        analyses: Arc<dyn AnalysisRepository>,
        orchestrator: Arc<Orchestrator>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            queue,
            analyses,
            orchestrator,
            config,
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered,
    /// then wait for in-flight analyses to finish.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let tasks = TaskTracker::new();
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            worker_id = %self.config.worker_id,
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Analysis dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Analysis dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // Claim until the queue is drained or every slot is busy.
                    loop {
                        let Ok(permit) = permits.clone().try_acquire_owned() else {
                            break;
                        };
                        let claim = match self.queue.claim(&self.config.worker_id, self.config.lease).await {
                            Ok(Some(claim)) => claim,
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to claim from queue");
                                break;
                            }
                        };

                        let this = self.clone();
                        tasks.spawn(async move {
                            this.handle_claim(claim).await;
                            drop(permit);
                        });
                    }
                }
            }
        }

        tasks.close();
        tasks.wait().await;
    }

    /// Claims and processes everything currently claimable, one at a time.
    /// Returns how many claims were handled.
    pub async fn drain(&self) -> Result<usize> {
        let mut handled = 0;
        while let Some(claim) = self
            .queue
            .claim(&self.config.worker_id, self.config.lease)
            .await?
        {
            self.handle_claim(claim).await;
            handled += 1;
        }
        Ok(handled)
    }

    async fn handle_claim(&self, claim: QueueClaim) {
        let analysis_id = claim.analysis_id;
        match self.process_with_renewal(&claim).await {
            Ok(()) => match self.queue.ack(&claim).await {
                Ok(true) => tracing::debug!(%analysis_id, "Claim acknowledged"),
                Ok(false) => {
                    tracing::warn!(%analysis_id, "Claim was lost before acknowledgement")
                }
                Err(e) => tracing::error!(%analysis_id, error = %e, "Failed to ack claim"),
            },
            Err(e) => {
                tracing::error!(
                    %analysis_id,
                    deliveries = claim.deliveries,
                    error = %e,
                    "Analysis left for redelivery"
                );
            }
        }
    }

    /// Runs [`Self::process`] while renewing the claim's lease, so a live
    /// analysis is never redelivered however long it takes.
    async fn process_with_renewal(&self, claim: &QueueClaim) -> Result<()> {
        let period = self.renewal_period();
        let mut renewal = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        renewal.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let work = self.process(claim);
        tokio::pin!(work);

        loop {
            tokio::select! {
                result = &mut work => return result,
                _ = renewal.tick() => {
                    match self.queue.extend_lease(claim, self.config.lease).await {
                        Ok(true) => {}
                        Ok(false) => tracing::warn!(
                            analysis_id = %claim.analysis_id,
                            "Lease was lost while processing"
                        ),
                        Err(e) => tracing::error!(
                            analysis_id = %claim.analysis_id,
                            error = %e,
                            "Failed to renew lease"
                        ),
                    }
                }
            }
        }
    }

    /// A third of the lease, leaving room for two missed renewals.
    fn renewal_period(&self) -> Duration {
        (self.config.lease / 3).max(Duration::from_millis(1))
    }

    /// Drives the claimed analysis to a terminal state.
    async fn process(&self, claim: &QueueClaim) -> Result<()> {
        let analysis = match self.analyses.find_by_id(claim.analysis_id).await {
            Ok(analysis) => analysis,
            Err(StorageError::NotFound) => {
                tracing::warn!(analysis_id = %claim.analysis_id, "Queued analysis no longer exists");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = match analysis.status {
            AnalysisStatus::Pending => self.orchestrator.run(claim.analysis_id).await?,
            // An earlier delivery started it and stopped renewing its lease.
            AnalysisStatus::Processing => {
                self.orchestrator
                    .fail(claim.analysis_id, FailureReason::Interrupted)
                    .await?
            }
            status => JobOutcome::Skipped(status),
        };

        match outcome {
            JobOutcome::Completed(_) | JobOutcome::Failed(_) => {}
            JobOutcome::Skipped(status) => {
                tracing::debug!(analysis_id = %claim.analysis_id, %status, "Nothing to do")
            }
        }
        Ok(())
    }
}
