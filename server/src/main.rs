use anyhow::Context;
use axum::serve;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use weecare_server::backend::{self, config::AppConfig};

#[derive(Parser)]
#[command(name = "weecare-server", about = "WeeCare child medical history tracker")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "weecare.toml")]
    config: PathBuf,

    /// Listen address override
    #[arg(short, long)]
    listen: Option<String>,

    /// Run against the in-memory backend instead of a Supabase project
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        info!("No config file at {}, using defaults", cli.config.display());
        AppConfig::default()
    };
    config.apply_env_overrides(|name| std::env::var(name).ok());
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    config.validate(cli.in_memory)?;

    let app_state = backend::initialize_backend(&config, cli.in_memory)?;

    // The home controller follows sign-in and sign-out for the whole process
    let auth_service = app_state.auth_service.clone();
    let auth_events = auth_service.subscribe();
    tokio::spawn(auth_service.watch_auth_events(auth_events));

    let router = backend::create_router(app_state);

    info!("Starting WeeCare on {}", config.listen_addr);
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    serve(listener, router).await?;

    Ok(())
}
