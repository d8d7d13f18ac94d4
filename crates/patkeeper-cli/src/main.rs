//! patkeeper - manage Personal Access Tokens from the terminal.

mod clipboard;
mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use patkeeper_core::auth::open_store;
use patkeeper_core::{ApiClient, Config, ControllerError, Notice, SessionController, Severity};

#[derive(Parser)]
#[command(name = "patkeeper")]
#[command(author, version, about = "Sign in and manage Personal Access Tokens", long_about = None)]
struct Cli {
    /// API base URL (overrides config and PATKEEPER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        /// Username (prompted for when omitted)
        #[arg(long, short)]
        username: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show who is signed in
    Whoami,

    /// List the applications and roles a token can be generated for
    Apps,

    /// List your tokens with masked secrets
    List {
        /// Show the plain secret for this application id (repeatable)
        #[arg(long, value_name = "APP_ID")]
        reveal: Vec<String>,

        /// Show every plain secret
        #[arg(long, conflicts_with = "reveal")]
        reveal_all: bool,
    },

    /// Generate a new token for a role
    Generate {
        #[arg(long, value_name = "ROLE_ID")]
        role: String,

        /// Application id, when the role alone is ambiguous
        #[arg(long, value_name = "APP_ID")]
        application: Option<String>,
    },

    /// Copy a token's secret to the clipboard
    Copy {
        #[arg(value_name = "APP_ID")]
        application: String,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG controls the level (default `warn`). With `log_to_file` set,
/// a daily-rotated log is also written under the data directory; the
/// returned guard must live until exit so buffered lines are flushed.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = if config.log_to_file {
        config.data_dir().ok().map(|dir| dir.join("logs"))
    } else {
        None
    };
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "patkeeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.severity {
            Severity::Info => eprintln!("{}: {}", notice.title, notice.description),
            Severity::Error => eprintln!("error: {}: {}", notice.title, notice.description),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (saved, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let mut config = saved.clone().with_env_overrides();
    if let Some(url) = cli.api_url.clone() {
        config.api_url = url;
    }

    let _guard = init_tracing(&config);
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(api_url = %config.api_url, storage = ?config.storage, "patkeeper starting");

    let data_dir = config.data_dir()?;
    let backend = ApiClient::new(config.api_url.clone(), config.request_timeout())?;
    let storage = open_store(config.storage, &data_dir);
    let mut controller = SessionController::restore(storage, std::sync::Arc::new(backend));

    let result = commands::run(cli.command, &mut controller, saved).await;
    print_notices(controller.drain_notices());

    // Returning (rather than exiting) lets the log guard flush on drop
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            if let Some(message) = failure_message(&e) {
                eprintln!("{}", message);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Text to print for a failed command. Controller failures were already
/// reported as notices.
fn failure_message(err: &anyhow::Error) -> Option<String> {
    if err.downcast_ref::<ControllerError>().is_some() {
        None
    } else {
        Some(format!("error: {:#}", err))
    }
}
