mod backend;
mod config;
mod errors;
mod i18n;
mod mailer;
mod pages;
mod registration;
mod routes;
mod state;
mod storage_setup;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::supabase::SupabaseClient;
use crate::config::Config;
use crate::i18n::Catalog;
use crate::mailer::{LogMailer, Mailer, WebhookMailer};
use crate::routes::build_router;
use crate::state::AppState;

/// LogBid marketing site and self-service registration.
#[derive(Parser, Debug)]
#[command(name = "logbid-web")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind to (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the storage buckets registration uploads to
    SetupStorage,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("logbid_web={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = SupabaseClient::new(
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
        config.supabase_service_role_key.clone(),
    )?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, client, port).await,
        Commands::SetupStorage => setup_storage(&client).await,
    }
}

async fn serve(config: Config, client: SupabaseClient, port: Option<u16>) -> Result<()> {
    info!("Starting LogBid web v{}", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(Catalog::embedded()?);
    info!("Translations loaded");

    let mailer: Arc<dyn Mailer> = match &config.welcome_email_webhook_url {
        Some(url) => {
            info!("Welcome emails go to webhook {url}");
            Arc::new(WebhookMailer::new(url.clone())?)
        }
        None => {
            warn!("WELCOME_EMAIL_WEBHOOK_URL not set; welcome emails are only logged");
            Arc::new(LogMailer)
        }
    };

    let port = port.unwrap_or(config.port);
    let state = AppState {
        backend: Arc::new(client),
        mailer,
        catalog,
        config,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn setup_storage(client: &SupabaseClient) -> Result<()> {
    info!("Setting up storage buckets");
    let report = storage_setup::ensure_buckets(client).await?;
    info!(
        "Storage setup finished: {} existing, {} created, {} failed",
        report.existing.len(),
        report.created.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        anyhow::bail!("Could not create buckets: {}", report.failed.join(", "));
    }
    Ok(())
}
