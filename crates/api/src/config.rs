use std::str::FromStr;
use std::time::Duration;

use edupub_core::generation::DEFAULT_GENERATION_TIMEOUT;
use edupub_publisher::rate_limiter::{RateLimiterConfig, DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC};

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Must exceed the
    /// publish wait timeout so a queued publish can report its own outcome.
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. When unset the server keeps content in memory.
    pub database_url: Option<String>,
    /// Base URL of the external publishing service.
    pub publishing_api_url: String,
    /// Bearer token for the publishing service (may be empty).
    pub publishing_api_token: String,
    /// Token bucket for outbound publishing calls.
    pub publish_rate: RateLimiterConfig,
    /// How long a request waits for its queued publishing call.
    pub publish_wait_timeout_secs: u64,
    /// Base URL of the text-generation backend.
    pub generation_api_url: String,
    /// Timeout for a single generation call.
    pub generation_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                   |
    /// |-----------------------------|---------------------------|
    /// | `HOST`                      | `0.0.0.0`                 |
    /// | `PORT`                      | `3000`                    |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`      | `120`                     |
    /// | `DATABASE_URL`              | unset (in-memory store)   |
    /// | `PUBLISHING_API_URL`        | `http://localhost:8300`   |
    /// | `PUBLISHING_API_TOKEN`      | empty                     |
    /// | `PUBLISH_RATE_CAPACITY`     | `3`                       |
    /// | `PUBLISH_RATE_PER_SEC`      | `3`                       |
    /// | `PUBLISH_WAIT_TIMEOUT_SECS` | `60`                      |
    /// | `GENERATION_API_URL`        | `http://localhost:8400`   |
    /// | `GENERATION_TIMEOUT_SECS`   | `50`                      |
    /// | `LOG_FORMAT`                | `pretty` (or `json`)      |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let publish_rate = RateLimiterConfig {
            capacity: parse_env("PUBLISH_RATE_CAPACITY", DEFAULT_CAPACITY),
            refill_per_sec: parse_env("PUBLISH_RATE_PER_SEC", DEFAULT_REFILL_PER_SEC),
        };

        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 120),
            database_url,
            publishing_api_url: std::env::var("PUBLISHING_API_URL")
                .unwrap_or_else(|_| "http://localhost:8300".into()),
            publishing_api_token: std::env::var("PUBLISHING_API_TOKEN").unwrap_or_default(),
            publish_rate,
            publish_wait_timeout_secs: parse_env("PUBLISH_WAIT_TIMEOUT_SECS", 60),
            generation_api_url: std::env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| "http://localhost:8400".into()),
            generation_timeout_secs: parse_env(
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT.as_secs(),
            ),
            log_format,
        }
    }

    pub fn publish_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_wait_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
