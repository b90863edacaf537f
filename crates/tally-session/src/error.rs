//! Session error types

use tally_http::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] tally_storage::StorageError),

    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
}

/// Why `POST /auth/refresh` did not yield a usable access token.
///
/// Cloneable so one outcome can be handed to every caller waiting on the
/// same refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh request did not complete: {0}")]
    Transport(#[from] TransportError),

    #[error("refresh rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed refresh response: {0}")]
    Malformed(String),

    #[error("new access token could not be persisted: {0}")]
    Persist(String),
}
