use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL for the connection page cache
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Base URL of the site serving `/title/{id}/movieconnections/` pages
    #[serde(default = "default_connections_base_url")]
    pub connections_base_url: String,

    /// User-Agent sent with every upstream request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request upstream timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Minimum spacing between two upstream requests
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Maximum number of linked titles disclosed per batch
    #[serde(default = "default_disclosure_cap")]
    pub disclosure_cap: usize,

    /// Wall-clock budget for one resolver run before it is cancelled
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Path to the `title.basics.tsv` dataset
    pub basics_path: PathBuf,

    /// Path to the `title.ratings.tsv` dataset
    pub ratings_path: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_connections_base_url() -> String {
    "https://www.imdb.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_min_request_interval_ms() -> u64 {
    250
}

fn default_disclosure_cap() -> usize {
    5
}

fn default_resolve_timeout_secs() -> u64 {
    120
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}
