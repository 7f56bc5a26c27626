//! taskdeck - manage your tasks from the terminal.
//!
//! Each subcommand is a view: `login` and `register` are public-only, `tasks`
//! is protected. The route guard runs before any view does its work.

mod app;
mod output;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskdeck_core::models::TaskStatus;
use taskdeck_core::Route;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

#[derive(Parser)]
#[command(name = "taskdeck", version, about = "Manage your tasks from the terminal")]
struct Cli {
    /// Backend base URL (overrides config and TASKDECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// End the session on this machine
    Logout,
    /// Show whether a session is present
    Status,
    /// Work with tasks
    #[command(subcommand)]
    Tasks(TaskCommand),
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// List tasks
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// PENDING or COMPLETED
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        search: Option<String>,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Show { id: String },
    /// Create a task
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change a task's title, description or status
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Delete a task
    Rm { id: String },
    /// Flip tasks between pending and completed
    Toggle {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Command {
    fn route(&self) -> Route {
        match self {
            Command::Login { .. } => Route::Login,
            Command::Register { .. } => Route::Register,
            Command::Tasks(_) => Route::Tasks,
            Command::Logout | Command::Status => Route::Home,
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let log_guard = init_tracing();
    let cli = Cli::parse();
    info!("taskdeck starting");

    let mut app = App::new(cli.api_url.as_deref())?;

    if !app.enter(cli.command.route()) {
        drop(log_guard);
        std::process::exit(2);
    }

    let result = match cli.command {
        Command::Login { email } => app.login(email).await,
        Command::Register { email, name } => app.register(email, name).await,
        Command::Logout => app.logout().await,
        Command::Status => {
            app.status();
            Ok(())
        }
        Command::Tasks(cmd) => app.tasks(cmd).await,
    };

    app.report_redirect();
    drop(log_guard);
    result
}
