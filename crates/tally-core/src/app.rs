//! Application state container
//!
//! One session, one navigator and one API client per process. Everything
//! that needs the session gets it from here at construction time.

use std::sync::Arc;

use tally_http::{ReqwestTransport, Transport};
use tally_navigation::{GuardDecision, Navigator, Route};
use tally_session::SessionStore;
use tally_storage::{Database, KeyValueStore};

use crate::api::{AuthApi, TransactionsApi};
use crate::client::ApiClient;
use crate::config::Config;
use crate::Result;

pub struct Tally {
    config: Config,
    session: SessionStore,
    navigator: Navigator,
    client: ApiClient,
}

impl Tally {
    /// Open the token database and connect to the configured backend
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let transport = ReqwestTransport::new(config.api_url.clone(), config.request_timeout)?;

        Self::with_parts(config, Arc::new(db), Arc::new(transport))
    }

    /// Assemble from explicit storage and transport
    pub fn with_parts(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let session = SessionStore::restore(storage, Arc::clone(&transport))?;
        let navigator = Navigator::new(Route::Root);
        navigator.navigate(Route::Root.path(), session.has_session());

        let client = ApiClient::new(transport, session.clone(), navigator.clone());

        tracing::info!(
            api_url = %config.api_url,
            route = %navigator.current(),
            "Tally initialized"
        );

        Ok(Self {
            config,
            session,
            navigator,
            client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.client.clone())
    }

    pub fn transactions(&self) -> TransactionsApi {
        TransactionsApi::new(self.client.clone())
    }

    /// Navigate with the guard evaluated against the live session
    pub fn navigate(&self, target: &str) -> GuardDecision {
        self.navigator.navigate(target, self.session.has_session())
    }
}
