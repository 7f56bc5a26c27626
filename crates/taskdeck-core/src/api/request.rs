//! Replayable request descriptions.
//!
//! A `PendingRequest` is built once and never changes. Each time it is sent,
//! the gateway derives a `RequestAttempt` that says which bearer token to use
//! and whether this is already the post-refresh replay.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use super::error::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    recover_unauthorized: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            recover_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body. Serialized up front so replays send identical bytes.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Append query parameters from any serializable map-like value
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        let value = serde_json::to_value(query)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode query: {}", e)))?;
        if let serde_json::Value::Object(map) = value {
            for (key, value) in map {
                let rendered = match value {
                    serde_json::Value::Null => continue,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                self.query.push((key, rendered));
            }
        }
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// A 401 on this request is final; no refresh is attempted.
    /// Used for the credential exchange endpoints themselves.
    pub fn without_refresh(mut self) -> Self {
        self.recover_unauthorized = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn recovers_unauthorized(&self) -> bool {
        self.recover_unauthorized
    }
}

/// One send of a `PendingRequest`.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestAttempt {
    retried: bool,
    bearer: Option<String>,
}

impl RequestAttempt {
    pub fn first(bearer: Option<String>) -> Self {
        Self {
            retried: false,
            bearer,
        }
    }

    /// The single replay allowed after a refresh
    pub fn retry(&self, bearer: String) -> Self {
        Self {
            retried: true,
            bearer: Some(bearer),
        }
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Whether a 401 on this attempt should start a refresh
    pub fn may_refresh(&self, request: &PendingRequest) -> bool {
        !self.retried && request.recovers_unauthorized()
    }
}

impl std::fmt::Debug for RequestAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAttempt")
            .field("retried", &self.retried)
            .field("authenticated", &self.bearer.is_some())
            .finish()
    }
}
