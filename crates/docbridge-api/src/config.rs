//! Runtime configuration read once at startup.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;

use docbridge_core::{defaults, Error, Result};

/// Application configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PAPERLESS_BASE_URL` | required | Paperless API root |
/// | `AUTH_TOKEN` | required | Paperless API token |
/// | `OLLAMA_HOST` | `http://localhost:11434` | Ollama base URL |
/// | `OLLAMA_MODEL` | required | Model used for extraction |
/// | `OLLAMA_TIMEOUT_SECS` | `120` | Chat request timeout |
/// | `PROCESSING_TAG` | `ai-processed` | Tag applied after a successful update |
/// | `ERROR_TAG` | `ai-error` | Tag applied after a failed update |
/// | `INBOX_TAG` | `Inbox` | Tag listed by `/doc/list_inbox` |
/// | `CACHE_TIME` | `60` | Metadata cache TTL in minutes |
/// | `LOG_LEVEL` | `INFO` | Default level when `RUST_LOG` is unset |
/// | `DEBUG` | `false` | Enables `/status/debug` |
/// | `HOST` | `0.0.0.0` | Listen address |
/// | `PORT` | `5000` | Listen port |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paperless_base_url: String,
    pub auth_token: String,
    pub ollama_host: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
    pub processing_tag: String,
    pub error_tag: String,
    pub inbox_tag: String,
    pub cache_time_minutes: u64,
    pub log_level: LogLevel,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    /// Named tag directive lists offered by `/doc/actions`.
    pub button_actions: BTreeMap<String, Vec<String>>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} must be set", key)))
        };

        let inbox_tag = get("INBOX_TAG").unwrap_or_else(|| defaults::INBOX_TAG.to_string());
        let button_actions = default_button_actions(&inbox_tag);

        Ok(Self {
            paperless_base_url: required("PAPERLESS_BASE_URL")?,
            auth_token: required("AUTH_TOKEN")?,
            ollama_host: get("OLLAMA_HOST").unwrap_or_else(|| defaults::OLLAMA_URL.to_string()),
            ollama_model: required("OLLAMA_MODEL")?,
            ollama_timeout_secs: parse_or(
                "OLLAMA_TIMEOUT_SECS",
                get("OLLAMA_TIMEOUT_SECS"),
                defaults::GEN_TIMEOUT_SECS,
            )?,
            processing_tag: get("PROCESSING_TAG")
                .unwrap_or_else(|| defaults::PROCESSING_TAG.to_string()),
            error_tag: get("ERROR_TAG").unwrap_or_else(|| defaults::ERROR_TAG.to_string()),
            inbox_tag,
            cache_time_minutes: parse_or(
                "CACHE_TIME",
                get("CACHE_TIME"),
                defaults::CACHE_TTL_MINUTES,
            )?,
            log_level: parse_or("LOG_LEVEL", get("LOG_LEVEL"), LogLevel::Info)?,
            debug: get("DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            host: get("HOST").unwrap_or_else(|| defaults::SERVER_HOST.to_string()),
            port: parse_or("PORT", get("PORT"), defaults::SERVER_PORT)?,
            button_actions,
        })
    }

    /// Address the HTTP server binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}

/// Default button actions; the inbox removal follows the configured inbox tag.
pub fn default_button_actions(inbox_tag: &str) -> BTreeMap<String, Vec<String>> {
    let leave_inbox = format!("{}{}", defaults::TAG_REMOVAL_MARKER, inbox_tag);
    BTreeMap::from([
        ("next".to_string(), vec![leave_inbox.clone()]),
        (
            "send_to_ai".to_string(),
            vec!["ai-title".to_string(), leave_inbox.clone()],
        ),
        (
            "investigate".to_string(),
            vec!["check".to_string(), leave_inbox],
        ),
    ])
}

/// Level names accepted in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}
