//! File-backed cookie jar.
//!
//! Tokens are mirrored here so that checks which run before the durable
//! store is reachable (the route guard) can still see them. Cookies carry the
//! same attributes a browser would apply: `Path=/`, `SameSite=Lax` and an
//! absolute expiry.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::TokenBackend;

/// Cookie jar file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// The jar holds bearer and refresh tokens: owner read/write only
#[cfg(unix)]
const COOKIE_FILE_MODE: u32 = 0o600;

/// Default cookie lifetime in days
pub const DEFAULT_COOKIE_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub same_site: SameSite,
    pub expires: DateTime<Utc>,
}

impl Cookie {
    pub fn new(name: &str, value: &str, max_age: Duration) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            expires: expiry_from_now(max_age),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        format!(
            "{}={}; Expires={}; Path={}; SameSite={}",
            self.name,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.path,
            self.same_site
        )
    }
}

/// `now + max_age`, or the default lifetime if that is out of range
fn expiry_from_now(max_age: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    now.checked_add_signed(max_age)
        .unwrap_or_else(|| now + Duration::days(DEFAULT_COOKIE_MAX_AGE_DAYS))
}

pub struct CookieJar {
    path: PathBuf,
    max_age: Duration,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl CookieJar {
    /// Open (or lazily create) the jar inside `dir`
    pub fn open(dir: &Path) -> Self {
        Self::with_max_age(dir, Duration::days(DEFAULT_COOKIE_MAX_AGE_DAYS))
    }

    pub fn with_max_age(dir: &Path, max_age: Duration) -> Self {
        Self {
            path: dir.join(COOKIE_FILE),
            max_age,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a live cookie by name. Expired cookies read as absent.
    pub fn get(&self, name: &str) -> Result<Option<Cookie>> {
        let _guard = self.lock.lock();
        Ok(self
            .read_all()?
            .into_iter()
            .find(|c| c.name == name && !c.is_expired()))
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut cookies = self.read_all()?;
        cookies.retain(|c| c.name != name && !c.is_expired());
        cookies.push(Cookie::new(name, value, self.max_age));
        self.write_all(&cookies)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(());
        }
        let mut cookies = self.read_all()?;
        cookies.retain(|c| c.name != name);
        self.write_all(&cookies)
    }

    /// All live cookies as a `Cookie` request header value
    pub fn header_value(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let pairs: Vec<String> = self
            .read_all()?
            .iter()
            .filter(|c| !c.is_expired())
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs.join("; ")))
        }
    }

    fn read_all(&self) -> Result<Vec<Cookie>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read cookie jar")?;
        serde_json::from_str(&contents).context("Failed to parse cookie jar")
    }

    fn write_all(&self, cookies: &[Cookie]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(cookies)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(COOKIE_FILE_MODE);
        }
        let mut file = options.open(&self.path).context("Failed to open cookie jar")?;

        // `mode` only applies when the file is created
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(COOKIE_FILE_MODE))
                .context("Failed to restrict cookie jar permissions")?;
        }

        file.write_all(contents.as_bytes())
            .context("Failed to write cookie jar")?;
        debug!(count = cookies.len(), "Cookie jar written");
        Ok(())
    }
}

impl TokenBackend for CookieJar {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key)?.map(|c| c.value))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delete(key)
    }
}
