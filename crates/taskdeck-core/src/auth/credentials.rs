//! Replicated token storage.
//!
//! Every write goes to all backends; reads walk the backends in order and take
//! the first value found. A backend that fails to *read* makes the token
//! absent rather than letting a later backend answer with a possibly stale
//! value.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Duration;
use tracing::{debug, warn};

use super::backend::{KeyringBackend, MemoryBackend, TokenBackend};
use super::cookie::CookieJar;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// An access/refresh token pair as issued by the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never end up in logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

pub struct CredentialStore {
    backends: Vec<Arc<dyn TokenBackend>>,
}

impl CredentialStore {
    /// Build a store over `backends`, listed in read precedence order
    pub fn new(backends: Vec<Arc<dyn TokenBackend>>) -> Self {
        Self { backends }
    }

    /// Keyring first, cookie jar in `cache_dir` second.
    /// Returns the store and the jar so the route guard can observe it.
    pub fn persistent(cache_dir: &Path, cookie_max_age: Duration) -> (Self, Arc<CookieJar>) {
        let jar = Arc::new(CookieJar::with_max_age(cache_dir, cookie_max_age));
        let store = Self::new(vec![
            Arc::new(KeyringBackend::new()),
            jar.clone() as Arc<dyn TokenBackend>,
        ]);
        (store, jar)
    }

    pub fn in_memory() -> Self {
        Self::new(vec![Arc::new(MemoryBackend::new())])
    }

    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.write(ACCESS_TOKEN_KEY, token)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.write(REFRESH_TOKEN_KEY, token)
    }

    /// Persist both tokens of a freshly issued pair.
    /// If either write fails the store is cleared, never left holding half a pair.
    pub fn store_credential(&self, credential: &Credential) -> Result<()> {
        let stored = self
            .set_access_token(&credential.access_token)
            .and_then(|()| self.set_refresh_token(&credential.refresh_token));
        if stored.is_err() {
            warn!("Token pair not fully persisted, clearing stored tokens");
            self.clear_tokens();
        }
        stored
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Both tokens, if both are readable
    pub fn credential(&self) -> Option<Credential> {
        Some(Credential::new(self.access_token()?, self.refresh_token()?))
    }

    pub fn has_session(&self) -> bool {
        self.access_token().is_some()
    }

    /// Remove both tokens from every backend. Never fails; errors are logged.
    pub fn clear_tokens(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            for backend in &self.backends {
                if let Err(e) = backend.remove(key) {
                    warn!(backend = backend.name(), key, error = %e, "Failed to clear token");
                }
            }
        }
        debug!("Tokens cleared");
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut failed = Vec::new();
        for backend in &self.backends {
            if let Err(e) = backend.save(key, value) {
                warn!(backend = backend.name(), key, error = %e, "Failed to persist token");
                failed.push(backend.name());
            }
        }

        if !self.backends.is_empty() && failed.len() == self.backends.len() {
            return Err(anyhow!("No backend accepted {}: {}", key, failed.join(", ")));
        }
        if !failed.is_empty() {
            warn!(key, failed = ?failed, "Token only partially persisted");
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        for backend in &self.backends {
            match backend.load(key) {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => continue,
                Err(e) => {
                    warn!(backend = backend.name(), key, error = %e, "Token read failed, treating as absent");
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend whose reads and/or writes always fail
    struct BrokenBackend {
        fail_reads: bool,
    }

    impl TokenBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn load(&self, _key: &str) -> Result<Option<String>> {
            if self.fail_reads {
                Err(anyhow!("read failed"))
            } else {
                Ok(None)
            }
        }

        fn save(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("write failed"))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("remove failed"))
        }
    }

    /// Backend that accepts everything except refresh token writes
    #[derive(Default)]
    struct RejectsRefresh {
        inner: MemoryBackend,
    }

    impl TokenBackend for RejectsRefresh {
        fn name(&self) -> &'static str {
            "rejects-refresh"
        }

        fn load(&self, key: &str) -> Result<Option<String>> {
            self.inner.load(key)
        }

        fn save(&self, key: &str, value: &str) -> Result<()> {
            if key == REFRESH_TOKEN_KEY {
                return Err(anyhow!("refresh write failed"));
            }
            self.inner.save(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn two_memory() ->(CredentialStore, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let durable = Arc::new(MemoryBackend::new());
        let cookie = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(vec![
            durable.clone() as Arc<dyn TokenBackend>,
            cookie.clone() as Arc<dyn TokenBackend>,
        ]);
        (store, durable, cookie)
    }

    #[test]
    fn test_writes_replicate_to_every_backend() {
        let (store, durable, cookie) = two_memory();
        store.store_credential(&Credential::new("tok1", "ref1")).unwrap();

        for backend in [&durable, &cookie] {
            assert_eq!(backend.load(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("tok1"));
            assert_eq!(backend.load(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("ref1"));
        }
    }

    #[test]
    fn test_read_prefers_durable_then_falls_back() {
        let (store, durable, cookie) = two_memory();
        durable.save(ACCESS_TOKEN_KEY, "durable").unwrap();
        cookie.save(ACCESS_TOKEN_KEY, "cookie").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("durable"));

        durable.remove(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("cookie"));
    }

    #[test]
    fn test_empty_value_falls_through() {
        let (store, durable, cookie) = two_memory();
        durable.save(REFRESH_TOKEN_KEY, "").unwrap();
        cookie.save(REFRESH_TOKEN_KEY, "ref1").unwrap();
        assert_eq!(store.refresh_token().as_deref(), Some("ref1"));
    }

    #[test]
    fn test_read_failure_fails_closed() {
        let cookie = Arc::new(MemoryBackend::new());
        cookie.save(ACCESS_TOKEN_KEY, "stale").unwrap();
        let store = CredentialStore::new(vec![
            Arc::new(BrokenBackend { fail_reads: true }) as Arc<dyn TokenBackend>,
            cookie as Arc<dyn TokenBackend>,
        ]);
        assert_eq!(store.access_token(), None);
        assert!(!store.has_session());
    }

    #[test]
    fn test_partial_write_succeeds() {
        let memory = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(vec![
            Arc::new(BrokenBackend { fail_reads: false }) as Arc<dyn TokenBackend>,
            memory.clone() as Arc<dyn TokenBackend>,
        ]);
        store.set_access_token("tok1").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("tok1"));
    }

    #[test]
    fn test_total_write_failure_is_an_error() {
        let store = CredentialStore::new(vec![
            Arc::new(BrokenBackend { fail_reads: false }) as Arc<dyn TokenBackend>,
        ]);
        assert!(store.set_refresh_token("ref1").is_err());
    }

    #[test]
    fn test_half_written_pair_is_cleared() {
        let backend = Arc::new(RejectsRefresh::default());
        backend.inner.save(ACCESS_TOKEN_KEY, "old").unwrap();
        backend.inner.save(REFRESH_TOKEN_KEY, "old-ref").unwrap();
        let store = CredentialStore::new(vec![backend.clone() as Arc<dyn TokenBackend>]);

        assert!(store.store_credential(&Credential::new("new", "new-ref")).is_err());

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(!store.has_session());
    }

    #[test]
    fn test_clear_tokens_is_idempotent_and_total() {
        let (store, durable, cookie) = two_memory();
        store.store_credential(&Credential::new("tok1", "ref1")).unwrap();

        store.clear_tokens();
        store.clear_tokens();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(durable.load(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(cookie.load(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_tolerates_broken_backend() {
        let memory = Arc::new(MemoryBackend::new());
        memory.save(ACCESS_TOKEN_KEY, "tok1").unwrap();
        let store = CredentialStore::new(vec![
            Arc::new(BrokenBackend { fail_reads: false }) as Arc<dyn TokenBackend>,
            memory.clone() as Arc<dyn TokenBackend>,
        ]);
        store.clear_tokens();
        assert_eq!(memory.load(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_credential_requires_both_tokens() {
        let store = CredentialStore::in_memory();
        store.set_access_token("tok1").unwrap();
        assert!(store.credential().is_none());

        store.set_refresh_token("ref1").unwrap();
        assert_eq!(store.credential(), Some(Credential::new("tok1", "ref1")));
    }

    #[test]
    fn test_credential_debug_redacts_tokens() {
        let rendered = format!("{:?}", Credential::new("secret-a", "secret-r"));
        assert!(!rendered.contains("secret"));
    }
}
