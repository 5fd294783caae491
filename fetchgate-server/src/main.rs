//! fetchgate Server - Headless Daemon
//!
//! A pure Rust HTTP server that:
//! - Intercepts every request that reaches it and routes it to the controller
//!   session that owns it (or to the real network)
//! - Accepts controller connections on /__fetchgate/controller (WebSocket)
//! - Provides a small REST API for the CLI on /api/*
//!
//! Access via: http://localhost:8046

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

mod api;
mod cli;
mod commands;
mod intercept;
mod router;
mod server_utils;
mod state;
#[cfg(test)]
mod test_helpers;
mod ws;

use cli::{Cli, Commands};
use fetchgate_core::modules::config as core_config;
use fetchgate_core::proxy::{integrity_checksum, InterceptorBuilder};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        None => serve(cli.port, None).await,
        Some(Commands::Serve { port, scope }) => serve(port.or(cli.port), scope).await,
        Some(Commands::Checksum) => commands::handle_checksum(),
        Some(Commands::Status { json }) => {
            let port = match cli.port {
                Some(port) => port,
                None => core_config::load_config()?.port,
            };
            commands::handle_status(port, json).await
        },
        Some(Commands::Config(cmd)) => commands::handle_config_command(cmd),
    }
}

async fn serve(port: Option<u16>, scope: Option<String>) -> Result<()> {
    let mut config = core_config::load_config()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(scope) = scope {
        config.scope = scope;
    }
    config.validate().map_err(fetchgate_types::ConfigError::from)?;

    info!("🚀 fetchgate starting on port {}...", config.port);

    let interceptor = InterceptorBuilder::from_config(&config)?.build()?;
    interceptor.start()?;

    info!("✅ Interceptor active for scope {}", config.scope);
    info!("🔐 Integrity checksum {}", integrity_checksum());

    let listener = server_utils::create_listener(&config).await?;
    let app = router::build_router(AppState::new(interceptor, config.clone()));

    info!("🌐 Server listening on http://{}", config.get_socket_addr());
    info!("🔌 Controllers connect to ws://{}{}", config.get_socket_addr(), router::CONTROLLER_PATH);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    info!("👋 fetchgate stopped");
    Ok(())
}
