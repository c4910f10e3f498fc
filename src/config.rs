//! Configuration types for fetch-queue

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Main configuration for [`FetchService`](crate::FetchService)
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Interval between progress polls while a job executes (default: 800 ms)
    #[serde(default = "default_poll_interval", with = "duration_millis")]
    pub poll_interval: Duration,

    /// Number of events retained for raw receivers before they lag (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// How long `shutdown()` waits for the worker to wind down (default: 30 s)
    #[serde(default = "default_shutdown_timeout", with = "duration_millis")]
    pub shutdown_timeout: Duration,

    /// External fetcher program settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Input classification rules
    #[serde(default)]
    pub classify: ClassifyConfig,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            event_buffer: default_event_buffer(),
            shutdown_timeout: default_shutdown_timeout(),
            source: SourceConfig::default(),
            classify: ClassifyConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// External fetcher program used by [`CommandSource`](crate::source::CommandSource)
///
/// Argument templates may contain `{id}`, which is replaced by the classified identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Explicit path to the fetcher program (searched on PATH if None)
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Program name looked up on PATH when `program` is not set (default: "fetcher")
    #[serde(default = "default_program_name")]
    pub program_name: String,

    /// Whether to search PATH when `program` is not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Arguments for a single-item fetch (default: `["post", "{id}"]`)
    #[serde(default = "default_single_args")]
    pub single_args: Vec<String>,

    /// Arguments for a collection fetch (default: `["profile", "{id}"]`)
    #[serde(default = "default_collection_args")]
    pub collection_args: Vec<String>,

    /// Working directory for the fetcher (inherits the process cwd if None)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            program: None,
            program_name: default_program_name(),
            search_path: true,
            single_args: default_single_args(),
            collection_args: default_collection_args(),
            working_dir: None,
        }
    }
}

/// Input classification rules
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// First path segments that mark a single-item link, e.g. `/p/<id>/` (default: `["p", "reel"]`)
    #[serde(default = "default_single_item_markers")]
    pub single_item_markers: Vec<String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            single_item_markers: default_single_item_markers(),
        }
    }
}

/// HTTP API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Whether [`FetchService::spawn_api_server`](crate::FetchService::spawn_api_server) is allowed (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind the API server to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser clients (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins, "*" for any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(800)
}

fn default_event_buffer() -> usize {
    1000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_program_name() -> String {
    "fetcher".to_string()
}

fn default_true() -> bool {
    true
}

fn default_single_args() -> Vec<String> {
    vec!["post".to_string(), "{id}".to_string()]
}

fn default_collection_args() -> Vec<String> {
    vec!["profile".to_string(), "{id}".to_string()]
}

fn default_single_item_markers() -> Vec<String> {
    vec!["p".to_string(), "reel".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Durations are written as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
