use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Two equivalent ways to configure:
//
//   config.toml:     [stream]
//                    fps = 10
//
//   env var:         CAMLINK_STREAM__FPS=10   (double underscore = nesting)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub stream: StreamFileConfig,
    #[serde(default)]
    pub telegram: TelegramFileConfig,
    #[serde(default)]
    pub executor: ExecutorFileConfig,
    #[serde(default)]
    pub dashboard: DashboardFileConfig,
}

/// Listener knobs (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Frame streaming knobs (lives under `[stream]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamFileConfig {
    /// File the capture process overwrites with the latest JPEG.
    #[serde(default = "default_frame_path")]
    pub frame_path: PathBuf,
    /// Image served while no frame is available. Built-in placeholder when
    /// unset.
    #[serde(default)]
    pub fallback_path: Option<PathBuf>,
    /// Target frame rate per client. The ack gate may deliver less.
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for StreamFileConfig {
    fn default() -> Self {
        Self {
            frame_path: default_frame_path(),
            fallback_path: None,
            fps: default_fps(),
        }
    }
}

/// Remote command feed knobs (lives under `[telegram]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramFileConfig {
    /// Bot token for the getUpdates feed. The poller is disabled when unset.
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for TelegramFileConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_api_base(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Action handler knobs (lives under `[executor]` in config.toml).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutorFileConfig {
    /// Program invoked with the command token as argument. Commands are
    /// logged and discarded when unset.
    #[serde(default)]
    pub program: Option<String>,
}

/// Static dashboard knobs (lives under `[dashboard]` in config.toml).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DashboardFileConfig {
    /// Directory of static dashboard assets to serve at `/`. Nothing is
    /// served when unset.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    9090
}
fn default_frame_path() -> PathBuf {
    PathBuf::from("/var/lib/camlink/latest.jpg")
}
fn default_fps() -> u32 {
    15
}
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_interval() -> u64 {
    1
}

/// Build a figment that layers: struct defaults → config.toml → CAMLINK_*
/// env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `CAMLINK_SERVER__PORT=8080`        →  `server.port = 8080`
///   `CAMLINK_TELEGRAM__BOT_TOKEN=...`  →  `telegram.bot_token = ...`
pub fn load_config(config_path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("CAMLINK_").split("__"))
}

pub fn extract_config(config_path: &Path) -> Result<FileConfig> {
    load_config(config_path)
        .extract()
        .with_context(|| format!("invalid configuration ({})", config_path.display()))
}

// =============================================================================
// Runtime config structs (derived from FileConfig, used throughout the server)
// =============================================================================

/// Frame streaming configuration (runtime view).
#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub frame_path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Tick period derived from the configured fps.
    pub frame_period: Duration,
}

impl StreamConfig {
    pub fn from_file(fc: &StreamFileConfig) -> Self {
        let fps = if fc.fps == 0 {
            warn!("stream.fps = 0 is not usable, using {}", default_fps());
            default_fps()
        } else {
            fc.fps
        };
        Self {
            frame_path: fc.frame_path.clone(),
            fallback_path: fc.fallback_path.clone(),
            frame_period: Duration::from_secs_f64(1.0 / fps as f64),
        }
    }
}

/// Remote command feed configuration (runtime view). `None` when no bot
/// token is configured — the poller task is simply not spawned.
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub poll_interval: Duration,
}

impl TelegramConfig {
    pub fn from_file(fc: &TelegramFileConfig) -> Option<Self> {
        let bot_token = fc.bot_token.clone().filter(|t| !t.is_empty())?;
        Some(Self {
            api_base: fc.api_base.clone(),
            bot_token,
            poll_interval: Duration::from_secs(fc.poll_interval_secs.max(1)),
        })
    }
}

pub fn bind_addr(fc: &ServerFileConfig) -> Result<SocketAddr> {
    format!("{}:{}", fc.host, fc.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", fc.host, fc.port))
}
