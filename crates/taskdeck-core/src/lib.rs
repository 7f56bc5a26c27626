//! Core library for taskdeck.
//!
//! Holds everything a taskdeck front-end needs to talk to the backend:
//!
//! - `auth`: credential store, session controller and route guard
//! - `api`: the HTTP gateway with transparent token refresh, plus the task API
//! - `models`: wire types shared with the backend
//! - `config`: on-disk configuration
//! - `routes`: the views a front-end can navigate to

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;

pub use api::{ApiClient, ApiError, TasksApi};
pub use auth::{AuthError, CredentialStore, RouteGuard, SessionController};
pub use config::Config;
pub use routes::{Navigator, RedirectSlot, Route};
