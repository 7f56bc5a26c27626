//! Task endpoints.

use tracing::debug;

use super::client::ApiClient;
use super::error::Result;
use crate::models::{CreateTask, Task, TaskQuery, TasksPage, UpdateTask};

pub struct TasksApi {
    client: ApiClient,
}

impl TasksApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch one page of tasks matching `query`
    pub async fn list(&self, query: &TaskQuery) -> Result<TasksPage> {
        let page: TasksPage = self.client.get_with_query("tasks", query).await?;
        debug!(
            count = page.tasks.len(),
            page = page.pagination.page,
            total = page.pagination.total,
            "Tasks fetched"
        );
        Ok(page)
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.client.get(&format!("tasks/{}", id)).await
    }

    pub async fn create(&self, input: &CreateTask) -> Result<Task> {
        self.client.post("tasks", input).await
    }

    pub async fn update(&self, id: &str, input: &UpdateTask) -> Result<Task> {
        self.client.patch(&format!("tasks/{}", id), input).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("tasks/{}", id)).await
    }

    /// Flip a task between pending and completed
    pub async fn toggle(&self, id: &str) -> Result<Task> {
        self.client.patch_empty(&format!("tasks/{}/toggle", id)).await
    }
}
