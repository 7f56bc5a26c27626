//! REST API client module for the taskdeck backend.
//!
//! `ApiClient` is the gateway every backend call goes through: it attaches
//! the bearer token and recovers from an expired access token with a single
//! refresh-and-replay. `TasksApi` layers the task endpoints on top.

pub mod client;
pub mod error;
pub mod request;
pub mod tasks;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::{PendingRequest, RequestAttempt};
pub use tasks::TasksApi;
