// ABOUTME: Environment-driven server configuration
// ABOUTME: Parses and validates every setting up front so bad values fail startup

use std::env;
use std::net::IpAddr;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use prdsmith_ai::{RetryPolicy, ANTHROPIC_API_URL, DEFAULT_MODEL};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),
    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Jitter factor {0} must be between 0 and 1")]
    JitterOutOfRange(f32),
    #[error("Invalid log format: {0} (expected pretty or json)")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_address: IpAddr,
    pub database_path: PathBuf,
    pub prompts_dir: Option<PathBuf>,
    pub cors_origin: HeaderValue,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub model: String,
    pub retry: RetryPolicy,
    pub webhook_secret: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = var("PORT").unwrap_or_else(|| "4010".to_string()).parse::<u16>()?;
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let bind_address = var("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_address = bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(bind_address))?;

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let cors_origin = cors_origin
            .parse::<HeaderValue>()
            .map_err(|_| ConfigError::InvalidCorsOrigin(cors_origin))?;

        let max_attempts = parse_number("GENERATION_MAX_ATTEMPTS", var("GENERATION_MAX_ATTEMPTS"), 3u32)?;
        let base_delay_ms = parse_number("GENERATION_BASE_DELAY_MS", var("GENERATION_BASE_DELAY_MS"), 1000u64)?;
        let jitter_factor = parse_number("GENERATION_JITTER", var("GENERATION_JITTER"), 0.0f32)?;
        if !(0.0..=1.0).contains(&jitter_factor) {
            return Err(ConfigError::JitterOutOfRange(jitter_factor));
        }

        let log_format = match var("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::Pretty,
        };

        Ok(Config {
            port,
            bind_address,
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(prdsmith_core::default_database_path),
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            cors_origin,
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            anthropic_base_url: var("ANTHROPIC_BASE_URL").unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: var("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                jitter_factor,
            },
            webhook_secret: var("ACCOUNT_WEBHOOK_SECRET"),
            log_format,
        })
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}
