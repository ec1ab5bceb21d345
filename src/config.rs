use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{DEFAULT_COMMENT_COUNT, MAX_COMMENT_COUNT};

#[derive(Parser, Debug)]
#[command(
    name = "bulk-extractor",
    about = "Bulk profile activity extractor with CSV in and CSV out"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the extraction API
    #[arg(long)]
    pub api_base_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// No timeout beyond the HTTP client's default when unset.
    pub request_timeout_secs: Option<u64>,
    pub default_count: u8,
    pub default_extract_comments: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_hours: u64,
    /// Keep results across batches (accumulating mode) instead of resetting
    /// them at every batch.
    pub retain_results: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://linkedin-extractor-v7yv.onrender.com".to_string(),
            request_timeout_secs: None,
            default_count: DEFAULT_COMMENT_COUNT,
            default_extract_comments: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "extractor_session".to_string(),
            ttl_hours: 12,
            retain_results: true,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref base_url) = cli.api_base_url {
            config.api.base_url = base_url.clone();
        }

        if config.api.default_count > MAX_COMMENT_COUNT {
            tracing::warn!(
                "default_count {} exceeds {}, clamping",
                config.api.default_count,
                MAX_COMMENT_COUNT
            );
            config.api.default_count = MAX_COMMENT_COUNT;
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".bulk-extractor")
        })
    }
}
