//! Tally Session Management
//!
//! The session is the pair of bearer credentials issued at login:
//! - The access token authenticates ordinary API calls; empty means logged out
//! - The refresh token is only ever sent to `POST /auth/refresh`
//! - Both live in memory and in durable storage, always written together
//! - A failed refresh tears the whole session down

mod error;
mod manager;
mod session;

pub use error::{RefreshError, SessionError};
pub use manager::{ExpiryHandler, SessionStore, REFRESH_PATH};
pub use session::{Session, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

pub type Result<T> = std::result::Result<T, SessionError>;
