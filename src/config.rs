//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf};

/// Top-level configuration
///
/// Every field has a sensible default so `Config::default()` works out of
/// the box for a local single-user deployment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Extraction engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Job lifecycle settings
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the API server (default: 127.0.0.1:3001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Whether to enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any origin (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Mount interactive Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,

    /// Static client UI directory served as the router fallback (default: None)
    #[serde(default)]
    pub web_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
            web_dir: None,
        }
    }
}

/// Download behavior configuration (directory, format defaults, transcoding)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory, also the cleanup target (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Engine format selector applied when a video job names none
    /// (default: single-file mp4, then separate mp4+m4a, then best available)
    #[serde(default = "default_video_format")]
    pub default_video_format: String,

    /// Engine format selector applied when an audio job names none
    /// (default: best audio-only stream, then best available)
    #[serde(default = "default_audio_format")]
    pub default_audio_format: String,

    /// Target audio codec for audio jobs (default: "mp3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Target audio quality for the transcoder (default: "192K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Container video jobs are remuxed/merged into (default: "mp4")
    #[serde(default = "default_video_container")]
    pub video_container: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            default_video_format: default_video_format(),
            default_audio_format: default_audio_format(),
            audio_codec: default_audio_codec(),
            audio_quality: default_audio_quality(),
            video_container: default_video_container(),
        }
    }
}

/// Extraction engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected from PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Search PATH for the engine binary when no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
        }
    }
}

/// Job lifecycle configuration (stream pacing, retention)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Progress stream poll interval in milliseconds (default: 500)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds of stream silence before a heartbeat frame is sent (default: 15)
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Seconds a terminal job is retained before the background sweep evicts
    /// it (default: 3600; None disables the sweep entirely)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: Option<u64>,

    /// Interval between retention sweeps in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_secs: default_heartbeat_secs(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_bind_address() -> SocketAddr {
    // Local-only by default; this server has no authentication layer
    "127.0.0.1:3001".parse().unwrap_or_else(|_| {
        SocketAddr::from(([127, 0, 0, 1], 3001))
    })
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_video_format() -> String {
    "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best".to_string()
}

fn default_audio_format() -> String {
    "bestaudio/best".to_string()
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_video_container() -> String {
    "mp4".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_heartbeat_secs() -> u64 {
    15
}

fn default_retention_secs() -> Option<u64> {
    Some(3600)
}

fn default_sweep_interval_secs() -> u64 {
    60
}
