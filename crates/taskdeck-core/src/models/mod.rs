//! Data models for taskdeck entities.
//!
//! - `User`, `AuthResponse`, `RefreshResponse`: auth endpoint payloads
//! - `Task`, `TaskStatus`, `TasksPage`: task resources and list pages
//! - `CreateTask`, `UpdateTask`, `TaskQuery`: task request payloads

pub mod task;
pub mod user;

pub use task::{CreateTask, Pagination, Task, TaskQuery, TaskStatus, TasksPage, UpdateTask};
pub use user::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, User};
