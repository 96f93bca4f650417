use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use dashboard_shell::{Navigation, ShellConfig, ShellContext};
use shell_auth::{
    AUTH_CHANGED, AuthEvent, USER_LOGGED_IN, USER_LOGGED_OUT, USER_ROLE_CHANGED,
};
use shell_core::{JsonFileStore, KeyValueStore};
use shell_events::AmbientHub;

/// Drive the dashboard shell from a terminal. Each invocation behaves like a
/// fresh page load over the same durable storage.
#[derive(Debug, Parser)]
#[command(name = "dashboard-shell", version)]
struct Cli {
    /// Storage file (defaults to SHELL_STORAGE_PATH, then the OS data dir).
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in as USERNAME.
    Login {
        username: String,
        /// Keep the session across restarts.
        #[arg(long)]
        remember: bool,
        /// Role to assign after signing in.
        #[arg(long)]
        role: Option<String>,
    },
    /// Sign out and forget any remembered session.
    Logout,
    /// Record a failed sign-in attempt.
    Fail { message: Option<String> },
    /// Run each path through the navigation guard, in order.
    Navigate {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Restore any remembered session and print it.
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ShellConfig::from_env().context("invalid shell configuration")?;
    if let Some(path) = cli.storage {
        config.storage_path = Some(path);
    }
    shell_observability::init_with(config.log_format, "info");

    let store = match &config.storage_path {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::open_default().context("no storage location available")?,
    };
    tracing::debug!(path = %store.path().display(), "using file storage");
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let ctx = ShellContext::init(config, store, AmbientHub::global());
    log_auth_events(&ctx);

    match cli.command {
        Command::Login {
            username,
            remember,
            role,
        } => {
            ctx.session().login(&username, remember)?;
            if let Some(role) = role {
                ctx.session().update_user_role(role)?;
            }
            print_json(&ctx.session().snapshot())?;
        }
        Command::Logout => {
            ctx.session().check_saved_auth()?;
            let logged_out = ctx.session().logout()?;
            print_json(&json!({ "loggedOut": logged_out }))?;
        }
        Command::Fail { message } => {
            ctx.session().login_failed(message.as_deref());
            print_json(&ctx.session().snapshot())?;
        }
        Command::Navigate { paths } => {
            let mut previous: Option<String> = None;
            for to in paths {
                let navigation = match previous.take() {
                    None => Navigation::initial(to),
                    Some(from) => Navigation::between(from, to),
                };
                let outcome = ctx.navigate(&navigation)?;
                print_json(&outcome)?;
                previous = Some(outcome.path);
            }
        }
        Command::Status => {
            ctx.session().check_saved_auth()?;
            print_json(&json!({
                "shell": ctx.info(),
                "session": ctx.session().snapshot(),
            }))?;
        }
    }

    Ok(())
}

fn log_auth_events(ctx: &ShellContext) {
    for name in [AUTH_CHANGED, USER_LOGGED_IN, USER_LOGGED_OUT, USER_ROLE_CHANGED] {
        ctx.bus().subscribe(name, move |payload| {
            match AuthEvent::decode(name, payload) {
                Some(event) => tracing::info!(event = name, "{event:?}"),
                None => tracing::warn!(event = name, %payload, "unexpected payload"),
            }
            Ok(())
        });
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
