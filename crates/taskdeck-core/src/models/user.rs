use serde::{Deserialize, Serialize};

use crate::auth::Credential;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl User {
    /// Name if set, otherwise the email address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Body of a successful login or registration
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

/// Body of a successful token refresh
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl From<RefreshResponse> for Credential {
    fn from(r: RefreshResponse) -> Self {
        Credential::new(r.access_token, r.refresh_token)
    }
}
