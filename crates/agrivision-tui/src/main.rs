//! AgriVision terminal dashboard.
//!
//! Wires the configured backend (or the in-process demo backend) into the
//! session store and dashboard controller, signs in, and hands control to
//! the terminal event loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agrivision_application::{DashboardController, SessionStore};
use agrivision_core::prediction::{ChangeFeed, PredictionRepository, RECENT_FETCH_LIMIT};
use agrivision_core::session::{Credentials, IdentityService};
use agrivision_infrastructure::{
    BackendConfig, InMemoryBackend, InMemoryIdentityService, PollChangeFeed, RestIdentityService,
    RestPredictionRepository,
};

mod app;
mod fixtures;
mod ui;

const DEMO_INSERT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "agrivision")]
#[command(about = "AgriVision - realtime crop yield analytics dashboard", long_about = None)]
struct Cli {
    /// Run against an in-process demo backend (no network, periodic inserts)
    #[arg(long)]
    demo: bool,

    /// Config file path (default: ~/.config/agrivision/config.toml)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Sign-in email (or AGRIVISION_EMAIL)
    #[arg(long)]
    email: Option<String>,

    /// Sign-in password (or AGRIVISION_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Create the account before signing in
    #[arg(long)]
    register: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never corrupt the dashboard.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let repository: Arc<dyn PredictionRepository>;
    let feed: Arc<dyn ChangeFeed>;
    let identity: Arc<dyn IdentityService>;
    let mut rest_repository: Option<Arc<RestPredictionRepository>> = None;
    let mut seeder_token = None;
    let table;
    let fetch_limit;

    if cli.demo {
        let backend = Arc::new(InMemoryBackend::with_demo_data());
        seeder_token = Some(backend.spawn_demo_seeder(DEMO_INSERT_INTERVAL));
        repository = backend.clone();
        feed = backend;
        identity = Arc::new(InMemoryIdentityService::demo());
        table = "predictions".to_string();
        fetch_limit = RECENT_FETCH_LIMIT;
    } else {
        let config = match &cli.config {
            Some(path) => BackendConfig::load_from(path)?,
            None => BackendConfig::load()?,
        };
        let rest = Arc::new(RestPredictionRepository::new(&config));
        rest_repository = Some(Arc::clone(&rest));
        repository = rest;
        feed = Arc::new(PollChangeFeed::new(&config));
        identity = Arc::new(RestIdentityService::new(&config));
        table = config.table;
        fetch_limit = config.fetch_limit;
    }

    let store = Arc::new(SessionStore::new(identity));
    store.bind().await;

    // Keep the repository's bearer token in lockstep with the session.
    let _token_subscription = rest_repository.as_ref().map(|rest| {
        let rest = Arc::clone(rest);
        store.subscribe(Arc::new(move |session| {
            rest.set_access_token(session.map(|s| s.access_token.clone()));
        }))
    });

    if !store.state().is_authenticated() {
        sign_in(&cli, &store).await?;
    }

    if let Some(rest) = &rest_repository
        && let Err(err) = rest.probe().await
    {
        tracing::warn!(error = %err, "backend probe failed; the dashboard may start empty");
    }

    let controller = Arc::new(DashboardController::new(
        repository,
        feed,
        table,
        fetch_limit,
    ));
    controller.mount().await;

    let tui_controller = Arc::clone(&controller);
    let tui_store = Arc::clone(&store);
    let handle = tokio::runtime::Handle::current();
    let result = tokio::task::spawn_blocking(move || app::run(tui_controller, tui_store, handle))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);

    controller.unmount();
    store.release();
    if let Some(token) = seeder_token {
        token.cancel();
    }
    result
}

/// Signs in with CLI/env credentials and waits for the session store to
/// apply the resulting auth event.
async fn sign_in(cli: &Cli, store: &Arc<SessionStore>) -> Result<()> {
    let email = cli
        .email
        .clone()
        .or_else(|| std::env::var("AGRIVISION_EMAIL").ok());
    let password = cli
        .password
        .clone()
        .or_else(|| std::env::var("AGRIVISION_PASSWORD").ok());
    let (Some(email), Some(password)) = (email, password) else {
        bail!(
            "no session; provide --email and --password \
             (or AGRIVISION_EMAIL / AGRIVISION_PASSWORD), or run with --demo"
        );
    };

    let credentials = Credentials::new(email, password);
    let result = if cli.register {
        store.sign_up(&credentials).await
    } else {
        store.sign_in(&credentials).await
    };
    if let Err(err) = result {
        bail!("sign-in failed: {err}");
    }

    // The state change arrives through the auth event feed.
    for _ in 0..100 {
        if store.state().is_authenticated() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("timed out waiting for the session to become active");
}
