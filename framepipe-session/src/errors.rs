//! Error types for the producer session.

use framepipe_pool::PoolError;
use thiserror::Error;

/// Broad failure categories, as recorded in a session's error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The display target was rejected or the backend failed to start.
    Initialization,
    /// The pool could not produce a buffer within its limits.
    Allocation,
    /// Submitted metadata was inconsistent with the checkout, or an
    /// operation was invoked in the wrong session state.
    Validation,
    /// The encoder collaborator rejected a frame.
    Encode,
}

/// Errors that can occur during producer session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session setup failed (invalid/unsupported display target, bad
    /// configuration, backend initialization failure).
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Buffer acquisition failed inside the pool.
    #[error("allocation failed: {0}")]
    Allocation(PoolError),

    /// Submit metadata inconsistent with the outstanding checkout, or an
    /// operation invalid for the session's state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The encoder collaborator rejected the frame.
    #[error("encode failed: {0:#}")]
    Encode(#[source] anyhow::Error),
}

impl SessionError {
    /// The broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization(_) => ErrorKind::Initialization,
            Self::Allocation(_) => ErrorKind::Allocation,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }

    /// Returns true if this error is fatal to the session.
    ///
    /// Only initialization failures are fatal: no session value exists
    /// afterwards. Allocation, validation and encode failures leave the
    /// session ready and the pool uncorrupted.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization(_))
    }
}

impl From<PoolError> for SessionError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Config(msg) => Self::Initialization(format!("pool configuration: {msg}")),
            other => Self::Allocation(other),
        }
    }
}
