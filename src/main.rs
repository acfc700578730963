//! Service entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scim_bridge::{AppState, Config, routes};

#[derive(Parser)]
#[command(name = "scim-bridge", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations and start the SCIM endpoint.
    Serve,

    /// Run database migrations and exit.
    Migrate,

    /// Rotate the SCIM API key and print the new plaintext token once.
    RotateKey,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let state = AppState::from_config(config).await?;
            state.repo.run_migrations().await?;
            Ok(())
        }
        Command::RotateKey => {
            let state = AppState::from_config(config).await?;
            let (api_key, token) = state.services.credentials.rotate().await?;

            println!("Rotated SCIM API key {}", api_key.id);
            println!("Bearer token (shown once, store it now):");
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let listen_addr = config.server.listen_addr.clone();

    let state = AppState::from_config(config).await?;
    state.repo.run_migrations().await?;

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;

    tracing::info!(%listen_addr, "SCIM bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
