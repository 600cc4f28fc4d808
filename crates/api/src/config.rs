//! Process configuration, read from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "files";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_QUEUE_KEY: &str = "jobs";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the pending queue and state register live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueBackend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(QueueBackend::Memory),
            "redis" => Ok(QueueBackend::Redis),
            other => Err(format!("expected `memory` or `redis`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Root of the filesystem blob store.
    pub data_dir: PathBuf,
    pub queue_backend: QueueBackend,
    pub redis_url: String,
    pub queue_key: String,
    pub poll_interval: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            queue_backend: QueueBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ApiConfig {
    /// Read `PORT`, `BIND_ADDR`, `DATA_DIR`, `QUEUE_BACKEND`, `REDIS_URL`,
    /// `QUEUE_KEY`, `WORKER_POLL_INTERVAL_MS` and `MAX_UPLOAD_BYTES`.
    /// Unset variables take their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ApiConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let bind_addr = parse_var(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr);
        let queue_backend = parse_var(&lookup, "QUEUE_BACKEND")?.unwrap_or(defaults.queue_backend);
        let poll_interval = parse_var::<u64>(&lookup, "WORKER_POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let max_upload_bytes =
            parse_var(&lookup, "MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);

        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "WORKER_POLL_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            port,
            data_dir: non_empty(&lookup, "DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            queue_backend,
            redis_url: non_empty(&lookup, "REDIS_URL").unwrap_or(defaults.redis_url),
            queue_key: non_empty(&lookup, "QUEUE_KEY").unwrap_or(defaults.queue_key),
            poll_interval,
            max_upload_bytes,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var).filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(lookup, var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}
