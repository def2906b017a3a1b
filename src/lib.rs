pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            config.validate()?;
            run_server(config).await
        }

        Commands::Purge => {
            config.validate()?;
            cli::cmd_purge(&config).await
        }

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!(
                    "✓ Config file created. Set {} and run again.",
                    config::JWT_SECRET_ENV
                );
            } else {
                println!("config.toml already exists, leaving it untouched.");
            }
            Ok(())
        }

        Commands::HashPassword { password } => cli::cmd_hash_password(&config, &password),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.general.log_format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .context("Failed to initialize logging")
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Peerly v{} starting...", env!("CARGO_PKG_VERSION"));

    let shared = Arc::new(SharedState::new(config).await?);
    let scheduler = shared.purge_scheduler.clone();

    let listener = start_services(&shared).await?;

    let shutdown = CancellationToken::new();

    let server_handle = listener.map(|(listener, addr)| {
        let app = api::router(api::create_app_state(shared));
        let stop = shutdown.clone();
        tokio::spawn(async move {
            info!("Web server running at http://{}", addr);
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
            {
                error!("Web server error: {}", e);
            }
        })
    });

    info!("Running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;

    shutdown.cancel();
    if let Some(handle) = server_handle
        && let Err(e) = handle.await
    {
        error!("Web server task failed: {}", e);
    }

    info!("Peerly stopped");
    Ok(())
}

/// Binds the listener, then starts the scheduler. Nothing is left running
/// when the bind fails.
async fn start_services(shared: &SharedState) -> anyhow::Result<Option<(TcpListener, String)>> {
    let listener = if shared.config.server.enabled {
        let addr = format!("0.0.0.0:{}", shared.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        Some((listener, addr))
    } else {
        None
    };

    if shared.config.scheduler.enabled {
        shared.purge_scheduler.start().await?;
    } else {
        info!("Purge scheduler disabled by config");
    }

    Ok(listener)
}
