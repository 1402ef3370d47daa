use storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
