//! Auth service endpoints

use tracing::{info, warn};

use tally_http::ApiRequest;

use crate::client::{ApiClient, ApiResult};
use crate::models::{Credentials, LoginResponse, MessageResponse};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const DELETE_ACCOUNT_PATH: &str = "/auth/delete";

/// Login, registration and account lifecycle.
///
/// Login and registration go out without the refresh protocol: a 401 from
/// `/auth/login` means bad credentials, not an expired session.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token pair and store both
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?;
        let tokens: LoginResponse = self.client.send_unauthenticated(request).await?.json()?;

        self.client
            .session()
            .set_tokens(&tokens.access_token, &tokens.refresh_token)?;

        info!(username = %credentials.username, "Logged in");
        Ok(())
    }

    pub async fn register(&self, credentials: &Credentials) -> ApiResult<String> {
        let request = ApiRequest::post(REGISTER_PATH).json(credentials)?;
        let response: MessageResponse = self.client.send_unauthenticated(request).await?.json()?;

        info!(username = %credentials.username, "Registered");
        Ok(response.message)
    }

    /// Revoke the refresh token server-side, then clear the local session.
    ///
    /// The local session is cleared even when revocation fails.
    pub async fn logout(&self) -> ApiResult<()> {
        let session = self.client.session();
        let refresh_token = session.refresh_token();

        if !refresh_token.is_empty() {
            let request = ApiRequest::post(LOGOUT_PATH).with_bearer(&refresh_token);
            if let Err(e) = self.client.send_unauthenticated(request).await {
                warn!(error = %e, "Refresh token revocation failed");
            }
        }

        session.logout()?;
        Ok(())
    }

    /// Delete the current account, then clear the local session
    pub async fn delete_account(&self) -> ApiResult<String> {
        let response: MessageResponse = self
            .client
            .send_json(ApiRequest::delete(DELETE_ACCOUNT_PATH))
            .await?;

        self.client.session().logout()?;
        info!("Account deleted");
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;
    use std::sync::Arc;
    use tally_http::mock::{MockReply, MockTransport};
    use tally_http::{Method, TransportError};
    use tally_navigation::Navigator;
    use tally_session::{SessionStore, REFRESH_PATH};
    use tally_storage::{KeyValueStore, MemoryStore};

    fn setup(entries: &[(&str, &str)]) -> (AuthApi, MemoryStore, Arc<MockTransport>) {
        let storage = MemoryStore::with_entries(entries.iter().copied());
        let transport = Arc::new(MockTransport::new());
        let session = SessionStore::restore(Arc::new(storage.clone()), transport.clone()).unwrap();
        let client = ApiClient::new(transport.clone(), session, Navigator::default());
        (AuthApi::new(client), storage, transport)
    }

    #[tokio::test]
    async fn test_login_stores_tokens() {
        let (auth, storage, transport) = setup(&[]);
        transport.on(
            Method::Post,
            LOGIN_PATH,
            MockReply::json(200, json!({ "access_token": "A1", "refresh_token": "R1" })),
        );

        auth.login(&Credentials::new("alice", "pw")).await.unwrap();

        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("A1"));
        assert_eq!(storage.get("refresh_token").unwrap().as_deref(), Some("R1"));

        let sent = &transport.requests()[0];
        assert_eq!(sent.body(), Some(&json!({ "username": "alice", "password": "pw" })));
        assert_eq!(sent.bearer(), None);
    }

    #[tokio::test]
    async fn test_bad_credentials_do_not_trigger_refresh() {
        let (auth, storage, transport) = setup(&[]);
        transport.on(
            Method::Post,
            LOGIN_PATH,
            MockReply::json(401, json!({ "message": "Invalid credentials" })),
        );

        let err = auth
            .login(&Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Domain { .. }));
        assert_eq!(transport.call_count(Method::Post, REFRESH_PATH), 0);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_register_returns_message() {
        let (auth, _, transport) = setup(&[]);
        transport.on(
            Method::Post,
            REGISTER_PATH,
            MockReply::json(201, json!({ "message": "User registered successfully" })),
        );

        let message = auth.register(&Credentials::new("bob", "pw")).await.unwrap();
        assert_eq!(message, "User registered successfully");
    }

    #[tokio::test]
    async fn test_logout_revokes_with_refresh_token() {
        let (auth, storage, transport) = setup(&[("access_token", "A1"), ("refresh_token", "R1")]);
        transport.on(
            Method::Post,
            LOGOUT_PATH,
            MockReply::json(200, json!({ "msg": "Logged out and refresh token revoked" })),
        );

        auth.logout().await.unwrap();

        assert_eq!(transport.requests_to(Method::Post, LOGOUT_PATH)[0].bearer(), Some("R1"));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_session_when_revocation_fails() {
        let (auth, storage, transport) = setup(&[("access_token", "A1"), ("refresh_token", "R1")]);
        transport.on(
            Method::Post,
            LOGOUT_PATH,
            MockReply::error(TransportError::Connect("refused".to_string())),
        );

        auth.logout().await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_logout_without_session_skips_revocation() {
        let (auth, _, transport) = setup(&[]);

        auth.logout().await.unwrap();
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_account_is_authenticated_then_logs_out() {
        let (auth, storage, transport) = setup(&[("access_token", "A1"), ("refresh_token", "R1")]);
        transport.on(
            Method::Delete,
            DELETE_ACCOUNT_PATH,
            MockReply::json(200, json!({ "message": "User deleted successfully" })),
        );

        let message = auth.delete_account().await.unwrap();

        assert_eq!(message, "User deleted successfully");
        assert_eq!(
            transport.requests_to(Method::Delete, DELETE_ACCOUNT_PATH)[0].bearer(),
            Some("A1")
        );
        assert!(storage.is_empty());
    }
}
