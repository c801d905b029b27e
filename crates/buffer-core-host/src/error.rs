//! Errors surfaced to the host.

use buffer_core::{DecodeError, PatchError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A failed host call. The wrapped structure is left unchanged.
pub enum HostError {
    #[error("{0}")]
    /// An argument had the wrong shape or an out-of-range value.
    Type(String),

    #[error(transparent)]
    /// A patch edit could not be reconciled with the recorded changes.
    Patch(#[from] PatchError),

    #[error(transparent)]
    /// A serialized patch could not be decoded.
    Decode(#[from] DecodeError),
}

impl HostError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log::debug!("rejecting host argument: {message}");
        HostError::Type(message)
    }
}

/// Result alias for host calls.
pub type HostResult<T> = Result<T, HostError>;
