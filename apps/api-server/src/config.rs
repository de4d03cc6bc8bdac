//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::net::IpAddr;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address (default: 0.0.0.0)
    pub host: IpAddr,
    /// Server port (default: 8000)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
    /// Load the sample companies and owners at startup
    pub seed_demo_data: bool,
}

fn is_truthy(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Host
        let host = match lookup("HOST") {
            Some(s) => s.parse().map_err(|e| ConfigError {
                field: "HOST",
                message: format!("Invalid IP address '{}': {}", s, e),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        // Port; FASTAPIPORT is honoured for existing deployments
        let (port_field, port_str) = match (lookup("PORT"), lookup("FASTAPIPORT")) {
            (Some(p), _) => ("PORT", Some(p)),
            (None, Some(p)) => ("FASTAPIPORT", Some(p)),
            (None, None) => ("PORT", None),
        };
        let port = match port_str {
            Some(s) => s.parse().map_err(|e| ConfigError {
                field: port_field,
                message: format!("Invalid port '{}': {}", s, e),
            })?,
            None => 8000,
        };

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        // Demo data
        let seed_demo_data = lookup("SEED_DEMO_DATA").is_some_and(|s| is_truthy(&s));

        Ok(Self {
            host,
            port,
            cors_allow_origin,
            log_format,
            seed_demo_data,
        })
    }

    /// Log warnings about permissive configuration.
    pub fn warn_if_insecure(&self) {
        if self.cors_allow_origin == HeaderValue::from_static("*") {
            tracing::warn!(
                "CORS_ALLOW_ORIGIN=*: any origin may call this API. \
                 Set CORS_ALLOW_ORIGIN to restrict browser access."
            );
        }
    }
}
