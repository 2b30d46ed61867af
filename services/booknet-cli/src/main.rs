//! BookNet command-line client
//!
//! 1. Parses the command line and loads configuration
//! 2. Opens the session file and checks the stored session with the server
//! 3. Runs one command: browsing, rating, profile or admin CRUD
//!
//! Command output goes to stdout, logs to stderr.

mod args;
mod commands;
mod config;
mod error;
mod session;
mod view;

use std::sync::Arc;

use anyhow::{Context, Result};
use booknet_api::{ApiClient, build_http_client};
use booknet_auth::CredentialStore;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::Cli;
use crate::commands::TerminalPrompt;
use crate::config::Config;
use crate::session::{SessionContext, SessionTimers};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let source = Config::resolve_path(cli.config.as_deref());
    debug!(path = %source.path().display(), "loading configuration");
    let config = Config::load(&source)
        .with_context(|| format!("failed to load config from {}", source.path().display()))?;

    let store_path = config.store_path()?;
    let store = CredentialStore::load(store_path.clone())
        .await
        .with_context(|| format!("failed to open session file {}", store_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        session_file = %store_path.display(),
        "configuration loaded"
    );

    let http = build_http_client(config.timeout()).context("failed to build HTTP client")?;
    let client = ApiClient::new(http, config.api.base_url.clone(), Arc::new(store));
    let ctx = SessionContext::new(
        client,
        SessionTimers {
            revalidate_every: config.revalidate_interval(),
            celebrate_for: config.celebrate_for(),
        },
    );

    // Login, registration and logout don't need the stored session checked.
    if !cli.command.is_public() {
        ctx.start().await;
    }

    let mut stdout = std::io::stdout().lock();
    let result = commands::run(&ctx, cli.command, &mut TerminalPrompt, &mut stdout).await;
    ctx.shutdown();
    result
}
