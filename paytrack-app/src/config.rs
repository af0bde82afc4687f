//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use anyhow::{Context, bail};
use paytrack_hex::inbound::ServerConfig;

/// Shortest accepted HS256 signing secret, in bytes.
const MIN_SECRET_LEN: usize = 32;

/// Log output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub jwt_secret: String,
    pub jwt_expiration: chrono::Duration,
    pub rate_limit_per_minute: u32,
    pub cors_origins: Vec<String>,
    pub reset_url_base: String,
    pub mail_queue_capacity: usize,
    pub token_sweep_interval: Duration,
    pub log_format: LogFormat,
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required")?;

        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN);
        }

        let jwt_minutes: i64 = parse_or(var("JWT_EXPIRATION_MINUTES"), "JWT_EXPIRATION_MINUTES", 60)?;
        if jwt_minutes <= 0 {
            bail!("JWT_EXPIRATION_MINUTES must be positive");
        }

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("plain") | Some("pretty") => LogFormat::Plain,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be `json` or `plain`, got `{}`", other),
        };

        let cors_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            database_url,
            server_addr: var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            jwt_secret,
            jwt_expiration: chrono::Duration::minutes(jwt_minutes),
            rate_limit_per_minute: parse_or(
                var("RATE_LIMIT_PER_MINUTE"),
                "RATE_LIMIT_PER_MINUTE",
                100,
            )?,
            cors_origins,
            reset_url_base: var("RESET_URL_BASE")
                .unwrap_or_else(|| "http://localhost:3000/auth/reset-password".to_string()),
            mail_queue_capacity: parse_or(var("MAIL_QUEUE_CAPACITY"), "MAIL_QUEUE_CAPACITY", 64)?,
            token_sweep_interval: Duration::from_secs(parse_or(
                var("TOKEN_SWEEP_INTERVAL_SECS"),
                "TOKEN_SWEEP_INTERVAL_SECS",
                86_400,
            )?),
            log_format,
            otel_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            rate_limit_per_minute: self.rate_limit_per_minute,
            cors_origins: self.cors_origins.clone(),
            token_sweep_interval: self.token_sweep_interval,
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8080");
        assert_eq!(config.jwt_expiration, chrono::Duration::minutes(60));
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.cors_origins, ["http://localhost:3000"]);
        assert_eq!(config.mail_queue_capacity, 64);
        assert_eq!(config.token_sweep_interval, Duration::from_secs(86_400));
        assert_eq!(config.log_format, LogFormat::Plain);
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    fn test_database_url_required() {
        let err = load(&[("JWT_SECRET", SECRET)]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[("DATABASE_URL", "sqlite::memory:"), ("JWT_SECRET", "short")])
            .unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/paytrack"),
            ("JWT_SECRET", SECRET),
            ("SERVER_ADDR", "127.0.0.1:9000"),
            ("JWT_EXPIRATION_MINUTES", "15"),
            ("RATE_LIMIT_PER_MINUTE", "5"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:9000");
        assert_eq!(config.jwt_expiration, chrono::Duration::minutes(15));
        assert_eq!(config.server_config().rate_limit_per_minute, 5);
        assert_eq!(config.cors_origins, ["https://a.example", "https://b.example"]);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_number_reported() {
        let err = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", SECRET),
            ("RATE_LIMIT_PER_MINUTE", "lots"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_PER_MINUTE"));
    }
}
