use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::matching::{FeatureFlagConfig, FlagParseError, WeightError, WeightTable};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cache = CacheConfig {
            url: non_empty_var("MATCH_CACHE_URL"),
            match_ttl: Duration::from_secs(whole_number_var("MATCH_CACHE_TTL_SECS", 300)?),
            catalog_ttl: Duration::from_secs(whole_number_var("MATCH_CATALOG_TTL_SECS", 3600)?),
            timeout: Duration::from_millis(whole_number_var("MATCH_CACHE_TIMEOUT_MS", 250)?),
        };

        let flags = match non_empty_var("MATCH_FEATURE_FLAGS") {
            Some(raw) => FeatureFlagConfig::parse(&raw).map_err(ConfigError::InvalidFlags)?,
            None => FeatureFlagConfig::default(),
        };
        let weights = match non_empty_var("MATCH_MODE_WEIGHTS") {
            Some(raw) => WeightTable::parse_overrides(&raw).map_err(ConfigError::InvalidWeights)?,
            None => WeightTable::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            cache,
            matching: MatchingConfig {
                flags,
                weights,
                catalog_csv: non_empty_var("MATCH_CATALOG_CSV").map(PathBuf::from),
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn whole_number_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidDuration { name, value: raw }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Match cache backend selection. Without a URL the service keeps results in process memory.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub match_ttl: Duration,
    pub catalog_ttl: Duration,
    pub timeout: Duration,
}

/// Algorithm knobs read once at startup.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub flags: FeatureFlagConfig,
    pub weights: WeightTable,
    pub catalog_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { name: &'static str, value: String },
    InvalidFlags(FlagParseError),
    InvalidWeights(WeightError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { name, value } => {
                write!(f, "{name} must be a whole number, got '{value}'")
            }
            ConfigError::InvalidFlags(_) => write!(f, "MATCH_FEATURE_FLAGS is malformed"),
            ConfigError::InvalidWeights(_) => write!(f, "MATCH_MODE_WEIGHTS is malformed"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDuration { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidFlags(source) => Some(source),
            ConfigError::InvalidWeights(source) => Some(source),
        }
    }
}
