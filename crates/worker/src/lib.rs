//! Background execution of analyses.
//!
//! [`Dispatcher`] claims queued analyses and hands each one to the
//! [`Orchestrator`], which drives it from `pending` to a terminal state.

pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;

pub use backoff::RetryPolicy;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{Result, WorkerError};
pub use orchestrator::{FailureReason, JobOutcome, Orchestrator, OrchestratorConfig};
