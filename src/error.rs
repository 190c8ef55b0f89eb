use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy shared by the runtime controller, the relation store
/// and the action handlers.
///
/// `Unavailable` and `Timeout` are transient: the next event delivery
/// retries them. `NotFound` self-heals once the missing service or
/// relation exists. `Validation` requires external correction and is
/// never retried with the same data.
#[derive(Debug, Error)]
pub enum Error {
    /// The runtime or network endpoint cannot be reached right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The service or relation does not exist yet.
    #[error("not found: {0}")]
    NotFound(String),

    /// An outbound call exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Malformed protocol payload; re-delivery of the same data cannot
    /// succeed.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Whether re-delivering the triggering event can succeed without
    /// external correction. Timeouts count as unavailability.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Error::Validation(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(crate::actions::REQUEST_TIMEOUT)
        } else if err.is_decode() {
            Error::Validation(err.to_string())
        } else {
            Error::Unavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
