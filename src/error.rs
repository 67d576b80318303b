use std::time::Duration;

use thiserror::Error;

use crate::future::Status;

/// Everything that can stand between a caller and a promise's value.
///
/// `E` is the application's rejection reason. It is carried unchanged; the
/// other variants are raised by the promise machinery itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error<E> {
    /// The promise was rejected with an application reason.
    #[error("promise rejected: {0}")]
    Rejected(E),
    #[error("promise was cancelled")]
    Cancelled,
    /// `wait_timeout` gave up before the promise settled.
    #[error("timed out after {0:?} waiting for promise to settle")]
    Timeout(Duration),
    /// Someone tried to settle a promise that already holds an outcome.
    #[error("promise already settled ({0:?})")]
    InvalidState(Status),
}

impl<E> Error<E> {
    /// The rejection reason, if this error carries one.
    pub fn into_reason(self) -> Option<E> {
        match self {
            Error::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;
