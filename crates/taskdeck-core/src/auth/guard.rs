//! Navigation-time access check.
//!
//! The guard only looks at the cookie-visible access token. It never calls the
//! backend and never touches the credential store.

use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::TokenBackend;
use super::credentials::ACCESS_TOKEN_KEY;
use crate::routes::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

pub struct RouteGuard {
    signal: Arc<dyn TokenBackend>,
}

impl RouteGuard {
    /// `signal` is the backend whose access token counts as "logged in",
    /// normally the cookie jar
    pub fn new(signal: Arc<dyn TokenBackend>) -> Self {
        Self { signal }
    }

    pub fn check(&self, path: &str) -> GuardDecision {
        Self::decide(path, self.token_observable())
    }

    /// Pure routing rule, given whether a token is visible
    pub fn decide(path: &str, has_token: bool) -> GuardDecision {
        let decision = if is_protected(path) && !has_token {
            GuardDecision::Redirect(Route::Login)
        } else if is_public_only(path) && has_token {
            GuardDecision::Redirect(Route::Tasks)
        } else {
            GuardDecision::Proceed
        };
        debug!(path, has_token, ?decision, "Route guard evaluated");
        decision
    }

    fn token_observable(&self) -> bool {
        match self.signal.load(ACCESS_TOKEN_KEY) {
            Ok(token) => token.is_some_and(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read session signal");
                false
            }
        }
    }
}

fn is_protected(path: &str) -> bool {
    under(path, Route::Tasks)
}

fn is_public_only(path: &str) -> bool {
    under(path, Route::Login) || under(path, Route::Register)
}

/// True for the route itself and anything beneath it, matching whole segments
fn under(path: &str, route: Route) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.strip_prefix(route.path()) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryBackend;

    fn guard_with(token: Option<&str>) -> RouteGuard {
        let backend = Arc::new(MemoryBackend::new());
        if let Some(token) = token {
            backend.save(ACCESS_TOKEN_KEY, token).unwrap();
        }
        RouteGuard::new(backend)
    }

    #[test]
    fn test_protected_without_token_redirects_to_login() {
        let guard = guard_with(None);
        assert_eq!(guard.check("/tasks"), GuardDecision::Redirect(Route::Login));
        assert_eq!(guard.check("/tasks/t1"), GuardDecision::Redirect(Route::Login));
        assert_eq!(guard.check("/tasks?page=2"), GuardDecision::Redirect(Route::Login));
    }

    #[test]
    fn test_public_only_with_token_redirects_to_tasks() {
        let guard = guard_with(Some("tok1"));
        assert_eq!(guard.check("/login"), GuardDecision::Redirect(Route::Tasks));
        assert_eq!(guard.check("/register"), GuardDecision::Redirect(Route::Tasks));
    }

    #[test]
    fn test_matching_views_proceed() {
        assert_eq!(guard_with(Some("tok1")).check("/tasks"), GuardDecision::Proceed);
        assert_eq!(guard_with(None).check("/login"), GuardDecision::Proceed);
        assert_eq!(guard_with(None).check("/register"), GuardDecision::Proceed);
    }

    #[test]
    fn test_other_views_untouched() {
        for has_token in [true, false] {
            assert_eq!(RouteGuard::decide("/", has_token), GuardDecision::Proceed);
            assert_eq!(RouteGuard::decide("/about", has_token), GuardDecision::Proceed);
        }
    }

    #[test]
    fn test_segment_matching() {
        assert_eq!(RouteGuard::decide("/tasksheet", false), GuardDecision::Proceed);
        assert_eq!(RouteGuard::decide("/login-help", true), GuardDecision::Proceed);
    }

    #[test]
    fn test_empty_token_is_not_a_session() {
        let guard = guard_with(Some(""));
        assert_eq!(guard.check("/tasks"), GuardDecision::Redirect(Route::Login));
    }
}
