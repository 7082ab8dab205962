use thiserror::Error;

/// Whole-request failures. Everything that is a property of a single
/// destination is absorbed into that delivery's terminal state instead
/// and never surfaces here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("daily limit of {limit} messages reached for user {username}")]
    RateLimited { username: String, limit: i64 },

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}
