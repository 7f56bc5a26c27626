//! HTTP gateway to the taskdeck backend.
//!
//! Every call reads the current access token from the credential store and
//! sends it as a bearer token. A 401 triggers one refresh through
//! `/auth/refresh` followed by exactly one replay of the original request;
//! whatever the replay returns is final. If the refresh is rejected the
//! tokens are cleared and the navigator is sent to the login view; if the
//! refresh never reaches the backend the tokens are kept.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credential, CredentialStore};
use crate::config::Config;
use crate::models::{RefreshRequest, RefreshResponse};
use crate::routes::{Navigator, Route};

use super::error::{ApiError, Result};
use super::request::{PendingRequest, RequestAttempt};

/// Token exchange endpoint, relative to the base URL
pub const REFRESH_PATH: &str = "auth/refresh";

/// Gateway to the backend.
/// Clone is cheap - the connection pool, store and refresh lock are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    timeout: Option<Duration>,
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    // Held for the whole refresh so concurrent 401s wait for a single exchange
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(format!("taskdeck/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            timeout: None,
            store,
            navigator,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn from_config(
        config: &Config,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        Ok(Self::new(&config.api_url(), store, navigator)?.with_timeout(config.request_timeout()))
    }

    /// Per-request timeout. `None` keeps the transport default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send `request`, recovering from one expired access token.
    ///
    /// Non-2xx responses become `ApiError`s. The returned response is the
    /// original one, or the replay's if a refresh happened.
    pub async fn execute(&self, request: &PendingRequest) -> Result<Response> {
        let attempt = RequestAttempt::first(self.store.access_token());
        let response = self.dispatch(request, &attempt).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !attempt.may_refresh(request) {
            return Self::check_response(response).await;
        }

        let original = Self::error_from(response).await;
        debug!(method = %request.method(), path = request.path(), "Unauthorized, refreshing session");

        let bearer = self.recover_session(attempt.bearer(), original).await?;
        let replay = attempt.retry(bearer);
        let response = self.dispatch(request, &replay).await?;
        Self::check_response(response).await
    }

    async fn dispatch(&self, request: &PendingRequest, attempt: &RequestAttempt) -> Result<Response> {
        let url = self.url(request.path())?;
        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(token) = attempt.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            retried = attempt.retried(),
            authenticated = attempt.bearer().is_some(),
            "Sending request"
        );
        Ok(builder.send().await?)
    }

    /// Obtain a usable access token after `stale` was rejected.
    async fn recover_session(&self, stale: Option<&str>, original: ApiError) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        // Someone else refreshed while we were waiting for the lock
        if let Some(current) = self.store.access_token() {
            if stale != Some(current.as_str()) {
                debug!("Access token already rotated, reusing it");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("No refresh token available, ending session");
            self.end_session();
            return Err(original);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(credential) => {
                if let Err(e) = self.store.store_credential(&credential) {
                    warn!(error = %e, "Refreshed tokens could not be persisted, replaying once with them");
                }
                info!("Access token refreshed");
                Ok(credential.access_token)
            }
            // Backend unreachable: the tokens may still be good, keep them
            Err(e) if e.is_network() => {
                warn!(error = %e, "Token refresh could not reach the backend");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.end_session();
                Err(ApiError::RefreshFailed(Box::new(e)))
            }
        }
    }

    /// Exchange a refresh token. Sent outside the retry path.
    async fn request_refresh(&self, refresh_token: &str) -> Result<Credential> {
        let mut builder = self.client.post(self.url(REFRESH_PATH)?).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        });
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = Self::check_response(builder.send().await?).await?;
        let refreshed: RefreshResponse = Self::parse_json(response, REFRESH_PATH).await?;
        Ok(refreshed.into())
    }

    fn end_session(&self) {
        self.store.clear_tokens();
        self.navigator.redirect(Route::Login);
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::from_status(status, &body)
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    // ===== Typed helpers =====

    /// Send and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: &PendingRequest) -> Result<T> {
        let response = self.execute(request).await?;
        Self::parse_json(response, request.path()).await
    }

    /// Send and discard the response body
    pub async fn send_unit(&self, request: &PendingRequest) -> Result<()> {
        self.execute(request).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(&PendingRequest::get(path)).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send_json(&PendingRequest::get(path).query(query)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(&PendingRequest::post(path).json(body)?).await
    }

    /// POST without a body, ignoring whatever comes back
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send_unit(&PendingRequest::post(path)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(&PendingRequest::patch(path).json(body)?).await
    }

    /// PATCH without a body
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(&PendingRequest::patch(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_unit(&PendingRequest::delete(path)).await
    }
}
