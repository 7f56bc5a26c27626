//! Login, registration and logout.
//!
//! The controller owns the in-memory identity of the current user. Tokens go
//! to the credential store; the user object is never persisted, so after a
//! restart a session can be authenticated without being identified.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use super::credentials::CredentialStore;
use crate::api::{ApiClient, ApiError, PendingRequest};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User};

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
const LOGOUT_PATH: &str = "auth/logout";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Network error: {0}")]
    Network(#[source] ApiError),

    #[error("Could not store session tokens: {0}")]
    Storage(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(message) => AuthError::InvalidCredentials(message),
            ApiError::Rejected { status, message } if matches!(status, 400 | 409 | 422) => {
                AuthError::InvalidCredentials(message)
            }
            e @ ApiError::NetworkError(_) => AuthError::Network(e),
            e => AuthError::Api(e),
        }
    }
}

pub struct SessionController {
    api: ApiClient,
    store: Arc<CredentialStore>,
    user: RwLock<Option<User>>,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        let store = api.store().clone();
        Self {
            api,
            store,
            user: RwLock::new(None),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = PendingRequest::post(LOGIN_PATH)
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?
            .without_refresh();
        self.establish(request).await
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        let request = PendingRequest::post(REGISTER_PATH)
            .json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            })?
            .without_refresh();
        self.establish(request).await
    }

    async fn establish(&self, request: PendingRequest) -> Result<User, AuthError> {
        let response: AuthResponse = self.api.send_json(&request).await?;

        self.store
            .store_credential(&response.credential())
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        info!(user_id = %response.user.id, path = request.path(), "Session established");
        *self.user.write() = Some(response.user.clone());
        Ok(response.user)
    }

    /// End the session. Local tokens and identity are always cleared; a
    /// failed remote call is still reported.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let remote = self.api.post_empty(LOGOUT_PATH).await;

        self.store.clear_tokens();
        *self.user.write() = None;

        match remote {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Remote logout failed, local session cleared");
                Err(e.into())
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Known user, or at least a stored access token
    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some() || self.store.has_session()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
