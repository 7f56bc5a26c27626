//! Views a front-end can navigate to, and the hook used to force navigation.

use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Tasks,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Tasks => "/tasks",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives forced navigations, e.g. back to login after the session ended.
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: Route);
}

/// Navigator that remembers the most recent redirect until it is taken.
#[derive(Default)]
pub struct RedirectSlot {
    pending: Mutex<Option<Route>>,
}

impl RedirectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent redirect, without consuming it
    pub fn peek(&self) -> Option<Route> {
        *self.pending.lock()
    }

    pub fn take(&self) -> Option<Route> {
        self.pending.lock().take()
    }
}

impl Navigator for RedirectSlot {
    fn redirect(&self, route: Route) {
        info!(%route, "Redirect requested");
        *self.pending.lock() = Some(route);
    }
}
