//! wfp-up (Waveform Peaks Upload) - HTTP front end for the two-pass
//! waveform pipeline
//!
//! Configuration: CLI > environment > TOML config file > compiled defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wfp_common::config::{ConfigLocator, TomlConfig};
use wfp_up::config::{ConfigOverrides, ServiceConfig};
use wfp_up::pipeline::Pipeline;
use wfp_up::tool::ProcessTool;
use wfp_up::{build_router, AppState};

/// Command-line arguments for wfp-up
#[derive(Parser, Debug)]
#[command(name = "wfp-up")]
#[command(about = "Waveform peaks upload service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file (falls back to WFP_CONFIG, then the
    /// platform config directories)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "WFP_BIND_ADDRESS")]
    bind: Option<String>,

    /// Analysis tool program name or path
    #[arg(long, env = "WFP_TOOL")]
    tool: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved before tracing so its log level can seed the filter
    let config_path = ConfigLocator::new("wfp-up").locate(args.config.as_deref());
    let toml = TomlConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;
    let overrides = ConfigOverrides {
        bind_address: args.bind,
        port: args.port,
        tool_program: args.tool,
    };
    let config = ServiceConfig::resolve(&toml, overrides).context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting wfp-up v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Loaded configuration from {}", path.display()),
        Some(path) => warn!("Config file {} not found, using compiled defaults", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    info!(
        "Upload ceiling: {} bytes, target peaks: {}",
        config.pipeline.max_upload_bytes, config.pipeline.target_peak_count
    );

    let tool = ProcessTool::new(config.tool_program.clone(), config.tool_timeout);
    if tool.is_available().await {
        info!("✓ Analysis tool available: {}", tool.program());
    } else {
        warn!(
            "Analysis tool '{}' could not be started; uploads will fail until it is installed",
            tool.program()
        );
    }

    let pipeline = Pipeline::new(Arc::new(tool), config.pipeline.clone());
    let app = build_router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("wfp-up listening on http://{}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
