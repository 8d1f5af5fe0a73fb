use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod command;
mod config;
mod executor;
mod frame;
mod handlers;
mod stream;
mod telegram;

use crate::command::CommandBus;
use crate::config::{StreamConfig, TelegramConfig};
use crate::executor::{ActionRunner, NullRunner, ProcessRunner};
use crate::frame::FrameSource;

/// Bound on commands queued for the executor.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "camlink")]
#[command(about = "Device-side camera bridge: live frame streaming and command relay")]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "/etc/camlink/config.toml")]
    config: PathBuf,

    /// Override the configured listen host
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub frames: Arc<FrameSource>,
    pub commands: CommandBus,
    pub frame_period: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "camlink=debug,tower_http=debug,info"
    } else {
        "camlink=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting camlink camera bridge");

    let mut file_config = config::extract_config(&cli.config)?;
    if let Some(host) = cli.host {
        file_config.server.host = host;
    }
    if let Some(port) = cli.port {
        file_config.server.port = port;
    }

    // Frame source
    let stream_config = StreamConfig::from_file(&file_config.stream);
    info!("frame source: {}", stream_config.frame_path.display());
    let frames = Arc::new(FrameSource::new(
        stream_config.frame_path.clone(),
        stream_config.fallback_path.as_deref(),
    ));

    // Command executor: the single consumer both command gateways feed into
    let (commands, command_rx) = CommandBus::new(COMMAND_QUEUE_DEPTH);
    let runner: Arc<dyn ActionRunner> = match &file_config.executor.program {
        Some(program) => {
            info!("action handler: {}", program);
            Arc::new(ProcessRunner::new(program.clone()))
        }
        None => {
            warn!("no executor.program configured, commands will be logged only");
            Arc::new(NullRunner)
        }
    };
    tokio::spawn(executor::run_executor(command_rx, runner));

    // Remote command feed
    match TelegramConfig::from_file(&file_config.telegram) {
        Some(telegram_config) => {
            tokio::spawn(telegram::TelegramPoller::new(telegram_config, commands.clone()).run());
        }
        None => info!("telegram.bot_token not set, remote command feed disabled"),
    }

    let state = AppState {
        frames,
        commands,
        frame_period: stream_config.frame_period,
    };

    // Build routes
    let app = handlers::routes()
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Serve the dashboard when configured
    let app = match &file_config.dashboard.assets_dir {
        Some(dir) => {
            info!("serving dashboard assets from {}", dir.display());
            app.fallback_service(ServeDir::new(dir))
        }
        None => app,
    };

    let addr = config::bind_addr(&file_config.server)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("camlink listening on http://{}", listener.local_addr()?);
    info!("  GET /stream        - live frame stream (WebSocket, ack-gated)");
    info!("  GET /command/on    - enable motion detection");
    info!("  GET /command/off   - disable motion detection");
    info!("  GET /command/send  - capture and send a photo");

    // Create shutdown signal handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")
}
