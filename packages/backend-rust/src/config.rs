use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 4_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Base URL of the content API the feed pulls candidates from. When
    /// unset, only the built-in static sources are used.
    pub content_api_base: Option<String>,
    /// Per-source fetch budget; a timed-out source contributes no candidates.
    pub source_timeout: Duration,
    /// Directory for JSON snapshot persistence. When unset, state is
    /// in-memory only.
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let content_api_base = std::env::var("CONTENT_API_BASE")
            .ok()
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty());

        let source_timeout = std::env::var("SOURCE_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_SOURCE_TIMEOUT_MS));

        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            log_level,
            content_api_base,
            source_timeout,
            data_dir,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
