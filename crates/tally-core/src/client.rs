//! Authenticated API client
//!
//! Wraps a [`Transport`] with two interceptors:
//!
//! ```text
//! outbound: attach `Authorization: Bearer <access token>` when logged in
//! inbound:  SENT -> 2xx                     -> DONE
//!           SENT -> 401 (initial)           -> REFRESHING -> ok   -> RESENT -> DONE | FAILED
//!                                                         -> fail -> REDIRECT -> FAILED
//!           SENT -> 401 (replay)            -> FAILED
//!           SENT -> other error / transport -> FAILED
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use tally_http::{ApiRequest, ApiResponse, StatusCode, Transport};
use tally_navigation::Navigator;
use tally_session::SessionStore;

use crate::error::ApiError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Which send of a request this is. A request is replayed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Replay,
}

impl Attempt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attempt::Initial => "initial",
            Attempt::Replay => "replay",
        }
    }
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    navigator: Navigator,
}

impl ApiClient {
    /// Build a client over `session`. A failed refresh redirects `navigator`
    /// to the login route, once per failure.
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore, navigator: Navigator) -> Self {
        let redirect = navigator.clone();
        session.on_expired(move |err| {
            warn!(error = %err, "Refresh failed, redirecting to login");
            redirect.redirect_to_login();
        });

        Self {
            transport,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Send a request with the current access token, refreshing and
    /// replaying once if the backend answers 401.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let mut attempt = Attempt::Initial;
        let mut outbound = self.authorize(&request);

        loop {
            let response = self.transport.send(&outbound).await.map_err(|e| {
                debug!(
                    path = %request.path(),
                    attempt = attempt.as_str(),
                    error = %e,
                    "Request did not complete"
                );
                ApiError::Network(e)
            })?;

            debug!(
                method = %request.method(),
                path = %request.path(),
                status = %response.status,
                attempt = attempt.as_str(),
                "Response received"
            );

            match Self::classify(response, attempt) {
                Err(ApiError::AuthExpired) => {
                    attempt = Attempt::Replay;
                    let token = self.refresh(&request).await?;
                    outbound = request.with_bearer(&token);
                }
                outcome => return outcome,
            }
        }
    }

    /// Send a request as-is: no bearer token, no refresh. Every non-2xx,
    /// 401 included, comes back as [`ApiError::Domain`].
    pub async fn send_unauthenticated(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = self.transport.send(&request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Domain {
                status: response.status,
                body: response.body,
            })
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        Ok(self.send(request).await?.json()?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    /// Sort a response into success or the error it represents for a given
    /// attempt. A first-attempt 401 maps to [`ApiError::AuthExpired`].
    pub fn classify(response: ApiResponse, attempt: Attempt) -> ApiResult<ApiResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let ApiResponse { status, body } = response;
        if status == StatusCode::UNAUTHORIZED {
            return Err(match attempt {
                Attempt::Initial => ApiError::AuthExpired,
                Attempt::Replay => ApiError::AuthRetryExhausted { status, body },
            });
        }

        Err(ApiError::Domain { status, body })
    }

    /// Outbound interceptor
    fn authorize(&self, request: &ApiRequest) -> ApiRequest {
        let token = self.session.access_token();
        if token.is_empty() {
            request.clone()
        } else {
            request.with_bearer(&token)
        }
    }

    async fn refresh(&self, request: &ApiRequest) -> ApiResult<String> {
        debug!(path = %request.path(), "Access token rejected, refreshing");

        Ok(self.session.refresh_coalesced().await?)
    }
}

impl Clone for ApiClient {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tally_http::mock::{MockReply, MockTransport};
    use tally_http::{Method, TransportError};
    use tally_navigation::{NavigationSignal, Route};
    use tally_session::{RefreshError, REFRESH_PATH};
    use tally_storage::{KeyValueStore, MemoryStore};
    use tokio::sync::broadcast::error::TryRecvError;

    struct Harness {
        client: ApiClient,
        storage: MemoryStore,
        transport: Arc<MockTransport>,
    }

    fn harness(entries: &[(&str, &str)]) -> Harness {
        let storage = MemoryStore::with_entries(entries.iter().copied());
        let transport = Arc::new(MockTransport::new());
        let session = SessionStore::restore(Arc::new(storage.clone()), transport.clone()).unwrap();
        let client = ApiClient::new(transport.clone(), session, Navigator::new(Route::Root));

        Harness {
            client,
            storage,
            transport,
        }
    }

    fn count_signals(rx: &mut tokio::sync::broadcast::Receiver<NavigationSignal>) -> usize {
        let mut count = 0;
        loop {
            match rx.try_recv() {
                Ok(_) => count += 1,
                Err(TryRecvError::Empty) => return count,
                Err(e) => panic!("unexpected receive error: {e:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_authenticated_request_carries_bearer() {
        let h = harness(&[]);
        h.client.session().set_access_token("A1").unwrap();
        h.client.session().set_refresh_token("R1").unwrap();
        h.transport.on(Method::Get, "/data", MockReply::ok("payload"));

        let response = h.client.send(ApiRequest::get("/data")).await.unwrap();

        assert_eq!(response.body, "payload");
        let sent = h.transport.requests_to(Method::Get, "/data");
        assert_eq!(sent[0].header_value("Authorization"), Some("Bearer A1"));
    }

    #[tokio::test]
    async fn test_token_change_applies_to_next_request() {
        let h = harness(&[("access_token", "A1")]);
        h.transport
            .on(Method::Get, "/data", MockReply::ok("one"))
            .on(Method::Get, "/data", MockReply::ok("two"));

        h.client.send(ApiRequest::get("/data")).await.unwrap();
        h.client.session().set_access_token("B7").unwrap();
        h.client.send(ApiRequest::get("/data")).await.unwrap();

        let bearers: Vec<_> = h
            .transport
            .requests_to(Method::Get, "/data")
            .iter()
            .map(|r| r.bearer().map(str::to_string))
            .collect();
        assert_eq!(bearers, vec![Some("A1".to_string()), Some("B7".to_string())]);
    }

    #[tokio::test]
    async fn test_no_session_sends_unauthenticated() {
        let h = harness(&[]);
        h.transport.on(Method::Get, "/public", MockReply::ok("{}"));

        h.client.send(ApiRequest::get("/public")).await.unwrap();

        let sent = h.transport.requests_to(Method::Get, "/public");
        assert_eq!(sent[0].header_value("Authorization"), None);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_request_replayed() {
        let h = harness(&[("access_token", "A1-expired"), ("refresh_token", "R1")]);
        let mut signals = h.client.navigator().subscribe();
        h.transport
            .on(Method::Post, "/data", MockReply::status(401, "expired"))
            .on(Method::Post, "/data", MockReply::ok("replayed"))
            .on(
                Method::Post,
                REFRESH_PATH,
                MockReply::json(200, json!({ "access_token": "A2" })),
            );

        let request = ApiRequest::post("/data")
            .json(&json!({ "amount": 5 }))
            .unwrap()
            .query("verbose", "1")
            .header("X-Request-Id", "abc");
        let response = h.client.send(request).await.unwrap();

        assert_eq!(response.body, "replayed");

        let refresh = h.transport.requests_to(Method::Post, REFRESH_PATH);
        assert_eq!(refresh.len(), 1);
        assert_eq!(refresh[0].bearer(), Some("R1"));

        let sent = h.transport.requests_to(Method::Post, "/data");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bearer(), Some("A1-expired"));
        assert_eq!(sent[1].bearer(), Some("A2"));
        assert_eq!(sent[1].body(), sent[0].body());
        assert_eq!(sent[1].query_pairs(), sent[0].query_pairs());
        assert_eq!(sent[1].header_value("X-Request-Id"), Some("abc"));

        assert_eq!(h.client.session().access_token(), "A2");
        assert_eq!(h.storage.get("access_token").unwrap().as_deref(), Some("A2"));
        assert_eq!(count_signals(&mut signals), 0);
    }

    #[tokio::test]
    async fn test_second_401_is_not_refreshed_again() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        h.transport
            .on(Method::Get, "/data", MockReply::status(401, "first"))
            .on(Method::Get, "/data", MockReply::status(401, "second"))
            .on(
                Method::Post,
                REFRESH_PATH,
                MockReply::json(200, json!({ "access_token": "A2" })),
            );

        let err = h.client.send(ApiRequest::get("/data")).await.unwrap_err();

        match err {
            ApiError::AuthRetryExhausted { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "second");
            }
            other => panic!("expected AuthRetryExhausted, got {other:?}"),
        }
        assert_eq!(h.transport.call_count(Method::Get, "/data"), 2);
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 1);
        // The refreshed session survives; only the request failed
        assert_eq!(h.client.session().access_token(), "A2");
    }

    #[tokio::test]
    async fn test_failed_refresh_logs_out_and_redirects_once() {
        let h = harness(&[("access_token", "A1-expired"), ("refresh_token", "R1")]);
        let mut signals = h.client.navigator().subscribe();
        h.transport
            .on(Method::Get, "/data", MockReply::status(401, ""))
            .on(Method::Post, REFRESH_PATH, MockReply::status(403, "revoked"));

        let err = h.client.send(ApiRequest::get("/data")).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::AuthRefresh(RefreshError::Rejected { status: 403, .. })
        ));
        assert_eq!(h.client.session().access_token(), "");
        assert_eq!(h.client.session().refresh_token(), "");
        assert!(h.storage.is_empty());
        assert_eq!(h.client.navigator().current(), Route::Login);
        assert_eq!(count_signals(&mut signals), 1);
        assert_eq!(h.transport.call_count(Method::Get, "/data"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        h.transport
            .on(Method::Get, "/a", MockReply::status(401, ""))
            .on(Method::Get, "/a", MockReply::ok("a"))
            .on(Method::Get, "/b", MockReply::status(401, ""))
            .on(Method::Get, "/b", MockReply::ok("b"))
            .on(
                Method::Post,
                REFRESH_PATH,
                MockReply::json(200, json!({ "access_token": "A2" }))
                    .delayed(Duration::from_millis(20)),
            );

        let (a, b) = tokio::join!(
            h.client.send(ApiRequest::get("/a")),
            h.client.send(ApiRequest::get("/b"))
        );

        assert_eq!(a.unwrap().body, "a");
        assert_eq!(b.unwrap().body, "b");
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 1);
        assert_eq!(h.transport.requests_to(Method::Get, "/b")[1].bearer(), Some("A2"));
    }

    #[tokio::test]
    async fn test_concurrent_failed_refresh_redirects_once() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        let mut signals = h.client.navigator().subscribe();
        h.transport
            .on(Method::Get, "/a", MockReply::status(401, ""))
            .on(Method::Get, "/b", MockReply::status(401, ""))
            .on(
                Method::Post,
                REFRESH_PATH,
                MockReply::status(401, "").delayed(Duration::from_millis(20)),
            );

        let (a, b) = tokio::join!(
            h.client.send(ApiRequest::get("/a")),
            h.client.send(ApiRequest::get("/b"))
        );

        assert!(matches!(a, Err(ApiError::AuthRefresh(_))));
        assert!(matches!(b, Err(ApiError::AuthRefresh(_))));
        assert_eq!(count_signals(&mut signals), 1);
    }

    #[tokio::test]
    async fn test_redirect_survives_cancelled_first_request() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        let mut signals = h.client.navigator().subscribe();
        h.transport
            .on(Method::Get, "/a", MockReply::status(401, ""))
            .on(Method::Get, "/b", MockReply::status(401, ""))
            .on(
                Method::Post,
                REFRESH_PATH,
                MockReply::status(403, "").delayed(Duration::from_millis(50)),
            );

        let first = tokio::time::timeout(
            Duration::from_millis(5),
            h.client.send(ApiRequest::get("/a")),
        )
        .await;
        assert!(first.is_err());

        let err = h.client.send(ApiRequest::get("/b")).await.unwrap_err();

        assert!(matches!(err, ApiError::AuthRefresh(_)));
        assert!(h.storage.is_empty());
        assert_eq!(h.client.navigator().current(), Route::Login);
        assert_eq!(count_signals(&mut signals), 1);
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn test_direct_refresh_failure_also_redirects() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        let mut signals = h.client.navigator().subscribe();
        h.transport
            .on(Method::Post, REFRESH_PATH, MockReply::status(401, ""));

        assert!(h.client.session().refresh_access_token().await.is_err());

        assert_eq!(h.client.navigator().current(), Route::Login);
        assert_eq!(count_signals(&mut signals), 1);
    }

    #[tokio::test]
    async fn test_domain_errors_pass_through() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        h.transport.on(
            Method::Post,
            "/transactions",
            MockReply::json(400, json!({ "message": "Insufficient balance" })),
        );

        let err = h
            .client
            .send(ApiRequest::post("/transactions"))
            .await
            .unwrap_err();

        match &err {
            ApiError::Domain { status, body } => {
                assert_eq!(*status, StatusCode::BAD_REQUEST);
                assert!(body.contains("Insufficient balance"));
            }
            other => panic!("expected Domain, got {other:?}"),
        }
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 0);
        assert!(h.client.session().has_session());
    }

    #[tokio::test]
    async fn test_network_errors_are_not_retried() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        h.transport.on(
            Method::Get,
            "/data",
            MockReply::error(TransportError::Timeout),
        );

        let err = h.client.send(ApiRequest::get("/data")).await.unwrap_err();

        assert!(matches!(err, ApiError::Network(TransportError::Timeout)));
        assert_eq!(h.transport.call_count(Method::Get, "/data"), 1);
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_send_treats_401_as_domain() {
        let h = harness(&[("access_token", "A1"), ("refresh_token", "R1")]);
        h.transport
            .on(Method::Post, "/auth/login", MockReply::status(401, "Invalid credentials"));

        let err = h
            .client
            .send_unauthenticated(ApiRequest::post("/auth/login"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Domain { .. }));
        assert_eq!(h.transport.requests()[0].bearer(), None);
        assert_eq!(h.transport.call_count(Method::Post, REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_json_helpers_decode_and_report_bad_bodies() {
        let h = harness(&[("access_token", "A1")]);
        h.transport
            .on(Method::Get, "/numbers", MockReply::ok("[1,2,3]"))
            .on(Method::Get, "/numbers", MockReply::ok("not json"));

        let numbers: Vec<i32> = h.client.get_json("/numbers").await.unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);

        let err = h.client.get_json::<Vec<i32>>("/numbers").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_classify() {
        let ok = ApiResponse::new(StatusCode::CREATED, "");
        assert!(ApiClient::classify(ok, Attempt::Initial).is_ok());

        let expired = ApiResponse::new(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(
            ApiClient::classify(expired.clone(), Attempt::Initial),
            Err(ApiError::AuthExpired)
        ));
        assert!(matches!(
            ApiClient::classify(expired, Attempt::Replay),
            Err(ApiError::AuthRetryExhausted { .. })
        ));

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, "");
        assert!(matches!(
            ApiClient::classify(missing, Attempt::Initial),
            Err(ApiError::Domain { .. })
        ));
    }
}
