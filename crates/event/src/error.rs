//! Acknowledgement error type

use thiserror::Error;

/// The error delivered to a receiver's nack callback.
///
/// Carries the first failure recorded anywhere in the event's ack tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AckError {
    /// The root deadline elapsed before the tree terminated
    #[error("event acknowledgement timed out")]
    Timeout,

    /// A downstream stage nacked the event
    #[error("{0}")]
    Failed(String),
}

impl AckError {
    /// Create a failure from any displayable error
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}
