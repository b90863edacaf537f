//! Session Store
//!
//! Owns the current tokens, keeps the durable copy in step with memory, and
//! performs the refresh call. Clones share the same session.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tally_http::{ApiRequest, Transport};
use tally_storage::KeyValueStore;

use crate::error::RefreshError;
use crate::session::{Session, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::Result;

pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshOutcome = std::result::Result<String, RefreshError>;
type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Called once per failed refresh, after the session has been cleared
pub type ExpiryHandler = Arc<dyn Fn(&RefreshError) + Send + Sync>;

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
}

pub struct SessionStore {
    session: Arc<RwLock<Session>>,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    /// Refresh currently on the wire, shared by everyone who hits a 401
    in_flight: Arc<Mutex<Option<RefreshFlight>>>,
    on_expired: Arc<RwLock<Option<ExpiryHandler>>>,
}

impl SessionStore {
    /// Load the session persisted by a previous run, or start logged out
    pub fn restore(storage: Arc<dyn KeyValueStore>, transport: Arc<dyn Transport>) -> Result<Self> {
        let session = Session {
            access_token: storage.get(ACCESS_TOKEN_KEY)?.unwrap_or_default(),
            refresh_token: storage.get(REFRESH_TOKEN_KEY)?.unwrap_or_default(),
        };

        info!(
            authenticated = session.is_authenticated(),
            "Restored session from storage"
        );

        Ok(Self {
            session: Arc::new(RwLock::new(session)),
            storage,
            transport,
            in_flight: Arc::new(Mutex::new(None)),
            on_expired: Arc::new(RwLock::new(None)),
        })
    }

    /// Install the handler run when a refresh fails. Replaces any previous
    /// handler; clones of this store share it.
    pub fn on_expired<F>(&self, handler: F)
    where
        F: Fn(&RefreshError) + Send + Sync + 'static,
    {
        *self.on_expired.write() = Some(Arc::new(handler));
    }

    pub fn access_token(&self) -> String {
        self.session.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.session.read().refresh_token.clone()
    }

    pub fn has_session(&self) -> bool {
        self.session.read().is_authenticated()
    }

    /// Snapshot of both tokens
    pub fn snapshot(&self) -> Session {
        self.session.read().clone()
    }

    pub fn set_access_token(&self, token: &str) -> Result<()> {
        let mut session = self.session.write();
        self.storage.set(ACCESS_TOKEN_KEY, token)?;
        session.access_token = token.to_string();
        Ok(())
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        let mut session = self.session.write();
        self.storage.set(REFRESH_TOKEN_KEY, token)?;
        session.refresh_token = token.to_string();
        Ok(())
    }

    /// Replace both tokens in one step, as after a login
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let mut session = self.session.write();
        let previous_access = self.storage.get(ACCESS_TOKEN_KEY)?;

        self.storage.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Err(e) = self.storage.set(REFRESH_TOKEN_KEY, refresh_token) {
            // Put the durable access token back so it still matches memory
            let rollback = match previous_access {
                Some(value) => self.storage.set(ACCESS_TOKEN_KEY, &value),
                None => self.storage.remove(ACCESS_TOKEN_KEY),
            };
            if let Err(rollback_err) = rollback {
                error!(error = %rollback_err, "Failed to roll back access token");
            }
            return Err(e.into());
        }

        session.access_token = access_token.to_string();
        session.refresh_token = refresh_token.to_string();
        Ok(())
    }

    /// Clear both tokens in memory and storage. Safe to call repeatedly.
    ///
    /// Memory is cleared even when storage fails; the storage error is
    /// still returned.
    pub fn logout(&self) -> Result<()> {
        let mut session = self.session.write();
        *session = Session::default();

        let removed = self
            .storage
            .remove(ACCESS_TOKEN_KEY)
            .and(self.storage.remove(REFRESH_TOKEN_KEY));
        drop(session);

        match removed {
            Ok(()) => {
                info!("Session cleared");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to remove persisted tokens");
                Err(e.into())
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// On any failure the session is logged out before the error is returned.
    pub async fn refresh_access_token(&self) -> Result<String> {
        Ok(self.refresh_coalesced().await?)
    }

    /// Join the refresh already on the wire, or start one.
    ///
    /// Concurrent callers share a single `POST /auth/refresh`. The flight
    /// outlives whoever started it: if that caller is dropped, the next
    /// caller drives it to completion.
    pub async fn refresh_coalesced(&self) -> RefreshOutcome {
        let flight = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(flight) => {
                    debug!("Joining in-flight token refresh");
                    flight.clone()
                }
                None => {
                    let store = self.clone();
                    let flight = async move {
                        let outcome = store.perform_refresh().await;
                        store.in_flight.lock().take();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let outcome = match self.request_access_token().await {
            Ok(token) => self
                .set_access_token(&token)
                .map(|()| token)
                .map_err(|e| RefreshError::Persist(e.to_string())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(token) => {
                info!("Access token refreshed");
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, clearing session");
                // logout() logs its own storage failure
                let _ = self.logout();

                let handler = self.on_expired.read().clone();
                if let Some(handler) = handler {
                    handler(&err);
                }
                Err(err)
            }
        }
    }

    async fn request_access_token(&self) -> RefreshOutcome {
        let request = ApiRequest::post(REFRESH_PATH).with_bearer(&self.refresh_token());
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let parsed: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(RefreshError::Malformed("empty access_token".to_string()));
        }

        Ok(parsed.access_token)
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            storage: Arc::clone(&self.storage),
            transport: Arc::clone(&self.transport),
            in_flight: Arc::clone(&self.in_flight),
            on_expired: Arc::clone(&self.on_expired),
        }
    }
}
