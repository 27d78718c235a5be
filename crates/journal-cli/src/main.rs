//! Journal CLI - a mood-tagged journal from the terminal
//!
//! Talks to the journal API; changes made while it is unreachable are queued
//! locally and sent with `journal sync`.

mod cli;
mod client;
mod commands;
mod debounce;
mod error;
mod gate;
mod offline;
mod paths;
mod recent_searches;
mod session;
mod store;

#[cfg(test)]
mod tests;

use std::time::Duration;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::client::JournalApiClient;
use crate::commands::add::run_add;
use crate::commands::auth_cmd::{run_login, run_logout, run_reset_password, run_signup};
use crate::commands::common::resolve_api_url;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::history::run_history;
use crate::commands::list::run_list;
use crate::commands::moods::run_moods;
use crate::commands::search::{run_search, SearchArgs};
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::error::CliError;
use crate::gate::{AuthGate, GateDecision, RouteKind};
use crate::paths::DataPaths;
use crate::session::FileSessionStore;
use crate::store::{JournalStore, StoreOptions};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "journal=info"
                    .parse()
                    .map_err(|error| CliError::Config(format!("{error}")))?,
            ),
        )
        .init();

    let cli = Cli::parse();
    let Some(route) = cli.command.route() else {
        return run_offline_command(cli.command);
    };

    let paths = DataPaths::resolve(cli.data_dir);
    let client = JournalApiClient::new(&resolve_api_url(cli.api_url))?;
    tracing::debug!(
        "Using journal API at {} with data in {}",
        client.base_url(),
        paths.root().display()
    );

    let options = StoreOptions {
        // One query per process leaves nothing to debounce.
        search_delay: Duration::ZERO,
        page_size: cli.command.page_size(),
        queue_path: Some(paths.offline_queue()),
        history_path: Some(paths.recent_searches()),
    };
    let store = JournalStore::new(
        client,
        Box::new(FileSessionStore::new(paths.session())),
        options,
    )?;

    store.initialize().await;
    let auth = store.auth_state().await;
    if let Some(error) = &auth.error {
        tracing::warn!("Continuing without a saved session: {error}");
    }
    match AuthGate::default().decide(RouteKind::classify(route), &auth) {
        GateDecision::Render => {}
        GateDecision::Wait => return Err(CliError::SessionPending),
        GateDecision::RedirectToLogin => return Err(CliError::NotSignedIn),
    }

    match cli.command {
        Commands::Signup { email, password } => run_signup(&store, &email, &password).await,
        Commands::Login { email, password } => run_login(&store, &email, &password).await,
        Commands::Logout => run_logout(&store).await,
        Commands::ResetPassword { email, redirect_to } => {
            run_reset_password(&store, &email, redirect_to).await
        }
        Commands::Add { content, mood } => run_add(&store, &content, mood).await,
        Commands::List { cursor, json, .. } => run_list(&store, cursor, json).await,
        Commands::Show { id } => run_show(&store, &id).await,
        Commands::Edit {
            id,
            content,
            mood,
            clear_mood,
        } => run_edit(&store, &id, content, mood, clear_mood).await,
        Commands::Delete { id } => run_delete(&store, &id).await,
        Commands::Search {
            query,
            mood,
            from,
            to,
            json,
            ..
        } => {
            let args = SearchArgs {
                terms: &query,
                mood,
                from: from.as_deref(),
                to: to.as_deref(),
                as_json: json,
            };
            run_search(&store, &args).await
        }
        Commands::History => run_history(&store).await,
        Commands::Sync => run_sync(&store).await,
        command @ (Commands::Moods { .. } | Commands::Completions { .. }) => {
            run_offline_command(command)
        }
    }
}

/// Commands that need neither the API nor a session.
fn run_offline_command(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Moods { json } => run_moods(json),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        _ => Ok(()),
    }
}
