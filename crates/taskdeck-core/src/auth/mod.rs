//! Authentication module for managing tokens and the user session.
//!
//! This module provides:
//! - `CredentialStore`: replicated storage for the access/refresh token pair
//! - `TokenBackend` implementations: OS keyring, cookie jar and in-memory
//! - `SessionController`: login, register and logout against the backend
//! - `RouteGuard`: navigation-time redirects based on token presence
//!
//! Identity (the `User`) lives only in memory; the store just proves that a
//! token exists.

pub mod backend;
pub mod cookie;
pub mod credentials;
pub mod guard;
pub mod session;

pub use backend::{KeyringBackend, MemoryBackend, TokenBackend};
pub use cookie::{Cookie, CookieJar, SameSite};
pub use credentials::{Credential, CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use guard::{GuardDecision, RouteGuard};
pub use session::{AuthError, SessionController};
