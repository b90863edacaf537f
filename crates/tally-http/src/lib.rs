//! Tally HTTP plumbing
//!
//! An immutable [`ApiRequest`] descriptor, the [`ApiResponse`] it produces,
//! and the [`Transport`] seam that actually moves bytes. Authentication and
//! retry policy live one layer up; nothing here knows about tokens beyond
//! formatting a bearer header.

mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod request;
mod transport;

pub use error::TransportError;
pub use request::{ApiRequest, ApiResponse, Method, AUTHORIZATION};
pub use reqwest::StatusCode;
pub use transport::{ReqwestTransport, Transport, DEFAULT_TIMEOUT};

pub type Result<T> = std::result::Result<T, TransportError>;
