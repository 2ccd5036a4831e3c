use thiserror::Error;

/// Failure taxonomy shared by every storage-backed operation.
///
/// `Validation` is a caller mistake and is never retried. `Unavailable` is a
/// connection-level storage failure, kept distinct from `Internal` so callers
/// can tell an outage from a bug. Raw driver errors never cross this
/// boundary — the backend crate classifies them before they surface here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
