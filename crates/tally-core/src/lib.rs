//! Tally Core
//!
//! Client-side wiring for the transaction tracker: an [`ApiClient`] that
//! attaches and refreshes bearer tokens, typed wrappers for the auth and
//! transaction services, and the [`Tally`] container that owns one session,
//! one navigator and one client for the whole process.

mod api;
mod app;
mod client;
mod config;
mod error;
mod models;

pub use api::{AuthApi, TransactionsApi};
pub use app::Tally;
pub use client::{ApiClient, ApiResult, Attempt};
pub use config::Config;
pub use error::{ApiError, CoreError};
pub use models::{
    Contractor, Credentials, LoginResponse, MessageResponse, NewTransaction, SortField,
    SortOrder, Status, StatusUpdate, SystemAccount, Transaction, TransactionQuery,
};

// Re-export core components
pub use tally_http::{
    ApiRequest, ApiResponse, Method, ReqwestTransport, StatusCode, Transport, TransportError,
};
pub use tally_navigation::{guard, GuardDecision, NavigationSignal, Navigator, Route};
pub use tally_session::{RefreshError, Session, SessionError, SessionStore};
pub use tally_storage::{Database, KeyValueStore, MemoryStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
