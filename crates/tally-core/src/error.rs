//! Core error types

use tally_http::{StatusCode, TransportError};
use tally_session::{RefreshError, SessionError};
use thiserror::Error;

/// Failure of a call made through [`crate::ApiClient`]
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never reached the server or timed out
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// 401 on a first attempt. The client answers it with a refresh and a
    /// replay, so callers only see it from [`crate::ApiClient::classify`].
    #[error("Access token expired")]
    AuthExpired,

    /// The refresh call failed; the session has been torn down
    #[error("Session refresh failed: {0}")]
    AuthRefresh(#[from] RefreshError),

    /// 401 again after a refresh and replay
    #[error("Still unauthorized after token refresh ({status}): {body}")]
    AuthRetryExhausted { status: StatusCode, body: String },

    /// Any other non-2xx response, passed through untouched
    #[error("Request failed with status {status}: {body}")]
    Domain { status: StatusCode, body: String },

    #[error("Could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    /// HTTP status for errors that carry one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::AuthExpired => Some(StatusCode::UNAUTHORIZED),
            ApiError::AuthRetryExhausted { status, .. } | ApiError::Domain { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tally_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),
}
