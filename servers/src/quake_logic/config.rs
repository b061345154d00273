use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lib_common::core::FeedSettings;
use lib_common::seismic::{UsgsSettings, DEFAULT_USGS_BASE_URL};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CONFIG_FILE: &str = "server_quake.conf";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_CACHE_MAX_AGE_SECONDS: u64 = 5 * 60;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Earthquake WebSocket relay for the USGS feeds", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "QUAKE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "QUAKE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "QUAKE_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "QUAKE_USGS_URL", help = "Base URL of the USGS GeoJSON summary feeds.")]
    pub usgs_base_url: Option<String>,

    #[clap(long, env = "QUAKE_POLL_INTERVAL_SECONDS", help = "Seconds between polls of the 1day feed.")]
    pub poll_interval_seconds: Option<u64>,

    #[clap(long, env = "QUAKE_CACHE_MAX_AGE_SECONDS", help = "Seconds a cached window is served without refetching.")]
    pub cache_max_age_seconds: Option<u64>,

    #[clap(long, env = "QUAKE_REQUEST_TIMEOUT_SECONDS", help = "Timeout in seconds for one upstream request.")]
    pub request_timeout_seconds: Option<u64>,

    #[clap(long, env = "QUAKE_FETCH_RETRIES", help = "Transient-failure retries per upstream request.")]
    pub fetch_retries: Option<u32>,

    #[clap(long, env = "TLS_CERT_PATH", help = "Path to the TLS certificate file.")]
    pub tls_cert_path: Option<PathBuf>,

    #[clap(long, env = "TLS_KEY_PATH", help = "Path to the TLS private key file.")]
    pub tls_key_path: Option<PathBuf>,
}

impl Config {
    fn defaults() -> Config {
        Config {
            port: Some(DEFAULT_PORT),
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            usgs_base_url: Some(DEFAULT_USGS_BASE_URL.to_string()),
            poll_interval_seconds: Some(DEFAULT_POLL_INTERVAL_SECONDS),
            cache_max_age_seconds: Some(DEFAULT_CACHE_MAX_AGE_SECONDS),
            request_timeout_seconds: Some(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            fetch_retries: Some(0),
            ..Default::default()
        }
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            usgs_base_url: other.usgs_base_url.or(self.usgs_base_url),
            poll_interval_seconds: other.poll_interval_seconds.or(self.poll_interval_seconds),
            cache_max_age_seconds: other.cache_max_age_seconds.or(self.cache_max_age_seconds),
            request_timeout_seconds: other.request_timeout_seconds.or(self.request_timeout_seconds),
            fetch_retries: other.fetch_retries.or(self.fetch_retries),
            tls_cert_path: other.tls_cert_path.or(self.tls_cert_path),
            tls_key_path: other.tls_key_path.or(self.tls_key_path),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            poll_interval: Duration::from_secs(self.poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS)),
            cache_max_age: Duration::from_secs(self.cache_max_age_seconds.unwrap_or(DEFAULT_CACHE_MAX_AGE_SECONDS)),
        }
    }

    pub fn usgs_settings(&self) -> UsgsSettings {
        UsgsSettings {
            base_url: self.usgs_base_url.clone().unwrap_or_else(|| DEFAULT_USGS_BASE_URL.to_string()),
            timeout: Duration::from_secs(self.request_timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS)),
            max_retries: self.fetch_retries.unwrap_or(0),
        }
    }

    /// Certificate and key, only when both are configured and present on disk.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) if cert.exists() && key.exists() => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }
}

pub fn load_config() -> Config {
    resolve(Config::parse())
}

/// Layers defaults, then the JSON config file, then env/CLI values (`cli`).
pub fn resolve(cli: Config) -> Config {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();

    // Logging is not set up yet at this point, hence stderr.
    if config_file_path.exists() {
        match read_config_file(&config_file_path) {
            Ok(file_config) => current_config = current_config.merge(file_config),
            Err(e) => eprintln!(
                "Ignoring config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            ),
        }
    }

    current_config.merge(cli)
}

fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path)?;
    Ok(serde_json::from_str::<Config>(&config_str)?)
}
