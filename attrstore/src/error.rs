//! Error types for attribute-store operations.

use common::ServiceError;

/// Error type for attribute-store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A non-retryable rejection from the remote service.
    Service(ServiceError),

    /// A transient failure that survived every retry; carries the last
    /// error the service returned.
    RetriesExhausted { attempts: u32, last: ServiceError },

    /// A batched write group addressed more items than one call may carry.
    /// Groups are never split automatically.
    BatchTooLarge { domain: String, items: usize },

    /// A write call carried more attribute pairs than the service accepts.
    TooManyAttributes { domain: String, attributes: usize },

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Service(err) => write!(f, "Service error: {}", err),
            Error::RetriesExhausted { attempts, last } => {
                write!(f, "Retries exhausted after {} attempts: {}", attempts, last)
            }
            Error::BatchTooLarge { domain, items } => {
                write!(f, "Batch for domain {} too large: {} items", domain, items)
            }
            Error::TooManyAttributes { domain, attributes } => write!(
                f,
                "Write for domain {} carries too many attributes: {}",
                domain, attributes
            ),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        Error::Service(err)
    }
}

/// Result type alias for attribute-store operations.
pub type Result<T> = std::result::Result<T, Error>;
