#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use taskdeck_core::api::ApiClient;
use taskdeck_core::auth::{CookieJar, Credential, CredentialStore, MemoryBackend, TokenBackend};
use taskdeck_core::routes::RedirectSlot;
use tempfile::TempDir;
use wiremock::MockServer;

/// A gateway wired to a mock backend, a memory "durable" store and a cookie
/// jar in a temp dir.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<CredentialStore>,
    pub jar: Arc<CookieJar>,
    pub redirects: Arc<RedirectSlot>,
    pub api: ApiClient,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self::against(server)
    }

    pub async fn with_tokens(access: &str, refresh: &str) -> Self {
        let harness = Self::new().await;
        harness
            .store
            .store_credential(&Credential::new(access, refresh))
            .unwrap();
        harness
    }

    pub fn against(server: MockServer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let jar = Arc::new(CookieJar::open(dir.path()));
        let store = Arc::new(CredentialStore::new(vec![
            Arc::new(MemoryBackend::new()) as Arc<dyn TokenBackend>,
            jar.clone() as Arc<dyn TokenBackend>,
        ]));
        let redirects = Arc::new(RedirectSlot::new());
        let api = ApiClient::new(&format!("{}/api", server.uri()), store.clone(), redirects.clone())
            .unwrap();

        Self {
            server,
            store,
            jar,
            redirects,
            api,
            _dir: dir,
        }
    }

    pub fn tokens(&self) -> (Option<String>, Option<String>) {
        (self.store.access_token(), self.store.refresh_token())
    }
}

pub fn task_json(id: &str, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": null,
        "status": status,
        "userId": "u1",
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
}

pub fn auth_json(access: &str, refresh: &str) -> Value {
    json!({
        "user": {"id": "u1", "email": "ada@example.com", "name": "Ada"},
        "accessToken": access,
        "refreshToken": refresh
    })
}
