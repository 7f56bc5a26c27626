//! Command handlers for the taskdeck CLI.
//!
//! `App` wires the credential store, gateway, session controller and route
//! guard together once per invocation and runs the selected view.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use taskdeck_core::api::{ApiClient, TasksApi};
use taskdeck_core::auth::{AuthError, CredentialStore, GuardDecision, RouteGuard, SessionController, TokenBackend};
use taskdeck_core::models::{CreateTask, TaskQuery, TaskStatus, UpdateTask};
use taskdeck_core::{Config, RedirectSlot, Route};
use tracing::{debug, warn};

use crate::output;
use crate::TaskCommand;

/// Environment variables that pre-fill the login prompts
const EMAIL_ENV: &str = "TASKDECK_EMAIL";
const PASSWORD_ENV: &str = "TASKDECK_PASSWORD";

pub struct App {
    config: Config,
    guard: RouteGuard,
    session: SessionController,
    tasks: TasksApi,
    redirects: Arc<RedirectSlot>,
}

impl App {
    pub fn new(api_url: Option<&str>) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let (store, jar) = CredentialStore::persistent(&cache_dir, config.cookie_max_age());
        let store = Arc::new(store);
        let redirects = Arc::new(RedirectSlot::new());

        let api_url = api_url.map(str::to_string).unwrap_or_else(|| config.api_url());
        let api = ApiClient::new(&api_url, store, redirects.clone())
            .with_context(|| format!("Invalid API URL: {}", api_url))?
            .with_timeout(config.request_timeout());
        debug!(base_url = %api.base_url(), "API client configured");

        Ok(Self {
            config,
            guard: RouteGuard::new(jar as Arc<dyn TokenBackend>),
            tasks: TasksApi::new(api.clone()),
            session: SessionController::new(api),
            redirects,
        })
    }

    /// Run the route guard for `route`. Returns false if the view must not run.
    pub fn enter(&self, route: Route) -> bool {
        match self.guard.check(route.path()) {
            GuardDecision::Proceed => true,
            GuardDecision::Redirect(Route::Login) => {
                eprintln!("Not logged in. Run `taskdeck login` first.");
                false
            }
            GuardDecision::Redirect(Route::Tasks) => {
                eprintln!("Already logged in. Run `taskdeck logout` to switch accounts.");
                false
            }
            GuardDecision::Redirect(other) => {
                eprintln!("Redirected to {}", other);
                false
            }
        }
    }

    /// Tell the user if the gateway ended the session during this run
    pub fn report_redirect(&self) {
        if let Some(Route::Login) = self.redirects.take() {
            eprintln!("Your session has expired. Run `taskdeck login` to sign in again.");
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(e) => e,
            None => self.prompt_email()?,
        };
        let password = Self::prompt_password()?;

        let user = self.session.login(&email, &password).await.context("Login failed")?;
        self.remember_email(email);

        println!("Logged in as {}", user.display_name());
        Ok(())
    }

    pub async fn register(&mut self, email: Option<String>, name: Option<String>) -> Result<()> {
        let email = match email {
            Some(e) => e,
            None => self.prompt_email()?,
        };
        let name = match name {
            Some(n) => n,
            None => Self::prompt("Name: ")?,
        };
        let password = Self::prompt_password()?;

        let user = self
            .session
            .register(&email, &password, &name)
            .await
            .context("Registration failed")?;
        self.remember_email(email);

        println!("Welcome, {}! You are now logged in.", user.display_name());
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        if !self.session.is_authenticated() {
            println!("Not logged in.");
            return Ok(());
        }

        // Local state is gone either way; only report the remote outcome
        let outcome = self.session.logout().await;
        if let Err(ref e) = outcome {
            warn!(error = %e, "Remote logout failed");
        }
        println!("{}", logout_message(&outcome));

        // A refresh during logout may have queued a login redirect; it is moot now
        self.redirects.take();
        Ok(())
    }

    pub fn status(&self) {
        let base_url = self.session.api().base_url();
        if self.session.is_authenticated() {
            match self.session.current_user() {
                Some(user) => println!("Logged in to {} as {}", base_url, user.display_name()),
                None => println!("Logged in to {}", base_url),
            }
        } else {
            println!("Not logged in to {}", base_url);
        }
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn prompt_email(&self) -> Result<String> {
        let default = std::env::var(EMAIL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.config.last_email.clone());

        let input = match default {
            Some(ref last) => Self::prompt(&format!("Email [{}]: ", last))?,
            None => Self::prompt("Email: ")?,
        };

        match (input.is_empty(), default) {
            (true, Some(last)) => Ok(last),
            (true, None) => bail!("Email is required"),
            (false, _) => Ok(input),
        }
    }

    fn prompt(label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            if !password.is_empty() {
                return Ok(password);
            }
        }
        let password = rpassword::prompt_password("Password: ")?;
        if password.is_empty() {
            bail!("Password is required");
        }
        Ok(password)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn tasks(&mut self, command: TaskCommand) -> Result<()> {
        match command {
            TaskCommand::List {
                page,
                limit,
                status,
                search,
                json,
            } => {
                let query = TaskQuery {
                    page: Some(page),
                    limit: Some(limit),
                    status,
                    search,
                };
                let page = self.tasks.list(&query).await.context("Failed to fetch tasks")?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&page)?);
                } else {
                    output::print_tasks_page(&page);
                }
            }
            TaskCommand::Show { id } => {
                let task = self.tasks.get(&id).await.context("Failed to fetch task")?;
                output::print_task(&task);
            }
            TaskCommand::Add { title, description } => {
                let input = CreateTask {
                    title,
                    description,
                    status: Some(TaskStatus::Pending),
                };
                let task = self.tasks.create(&input).await.context("Failed to create task")?;
                println!("Created {}", output::task_line(&task));
            }
            TaskCommand::Edit {
                id,
                title,
                description,
                status,
            } => {
                let input = UpdateTask {
                    title,
                    description,
                    status,
                };
                if input.is_empty() {
                    bail!("Nothing to change: pass --title, --description or --status");
                }
                let task = self.tasks.update(&id, &input).await.context("Failed to update task")?;
                println!("Updated {}", output::task_line(&task));
            }
            TaskCommand::Rm { id } => {
                self.tasks.delete(&id).await.context("Failed to delete task")?;
                println!("Deleted {}", id);
            }
            TaskCommand::Toggle { ids } => self.toggle_all(&ids).await?,
        }
        Ok(())
    }

    /// Toggle several tasks concurrently
    async fn toggle_all(&self, ids: &[String]) -> Result<()> {
        let results = join_all(ids.iter().map(|id| self.tasks.toggle(id))).await;

        let mut failed = 0;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(task) => println!("{}", output::task_line(&task)),
                Err(e) => {
                    eprintln!("{}: {}", id, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} toggles failed", failed, ids.len());
        }
        Ok(())
    }
}

fn logout_message(outcome: &std::result::Result<(), AuthError>) -> String {
    match outcome {
        Ok(()) => "Logged out.".to_string(),
        Err(AuthError::Network(_)) => {
            "Logged out locally (server could not be reached).".to_string()
        }
        Err(e) => format!("Logged out locally (server did not confirm: {}).", e),
    }
}
