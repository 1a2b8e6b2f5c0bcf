//! Configuration management for logalert
//!
//! This module defines the `Config` struct and its sub-structs, holding all
//! alerting settings. It uses the `figment` crate to load configuration from
//! a `logalert.toml` file and merge it with environment variables. It also
//! carries the validation helpers for the endpoint string and mail address
//! syntax, applied once at setup time.

use crate::errors::ConfigurationError;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// The main configuration struct.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Minimum severity the host logger should emit.
    pub log_level: String,
    /// Output settings for the primary log stream.
    pub output: OutputConfig,
    /// Mail alerting settings.
    pub mail: MailConfig,
    /// Suppression window settings.
    pub suppression: SuppressionConfig,
    /// Whether composed messages and the console mirror capture a stack
    /// trace. Capture is unconditional in the system this replaces; the
    /// switch exists because unconditional capture is expensive.
    #[serde(default = "default_true")]
    pub capture_backtrace: bool,
}

/// The format for the primary log output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(ConfigurationError::InvalidFormat(other.to_string())),
        }
    }
}

/// Output settings for the primary log stream.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// The format to use for the primary output.
    pub format: OutputFormat,
}

/// When the mail sink stamps the suppression keys relative to the network
/// transaction.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolicy {
    /// Stamp before sending: a failed send still consumes the window. This
    /// is the default; it keeps repeated failures from hammering a mail
    /// server that may be down, at the cost of silently losing an alert.
    BeforeSend,
    /// Stamp only after the server accepted the payload.
    AfterSend,
}

/// Mail alerting settings, validated once at construction time.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MailConfig {
    /// The SMTP endpoint as `host:port`.
    pub endpoint: String,
    /// Application name used in mail subjects.
    pub app_name: String,
    /// Envelope sender address.
    pub sender: String,
    /// Envelope recipient address.
    pub recipient: String,
    /// Username for PLAIN authentication. Unauthenticated when absent.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for PLAIN authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Suppression marking policy.
    #[serde(default = "default_mark_policy")]
    pub mark_policy: MarkPolicy,
}

/// Suppression window settings. The global window should stay strictly
/// shorter than the message window.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SuppressionConfig {
    /// Window for the global sentinel key, in seconds.
    pub global_window_seconds: u64,
    /// Window for a message-specific key, in seconds.
    pub message_window_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_mark_policy() -> MarkPolicy {
    MarkPolicy::BeforeSend
}

impl Config {
    /// Loads configuration by layering defaults, the TOML file, and
    /// `LOGALERT_`-prefixed environment variables.
    pub fn load(config_path: &str) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // Allow overriding with environment variables, e.g.
            // LOGALERT_LOG_LEVEL=debug
            .merge(Env::prefixed("LOGALERT_"))
            .extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            output: OutputConfig {
                format: OutputFormat::Text,
            },
            mail: MailConfig {
                endpoint: "localhost:25".to_string(),
                app_name: "app".to_string(),
                sender: "alerts@localhost.localdomain".to_string(),
                recipient: "oncall@localhost.localdomain".to_string(),
                username: None,
                password: None,
                mark_policy: MarkPolicy::BeforeSend,
            },
            suppression: SuppressionConfig {
                global_window_seconds: 60,
                message_window_seconds: 600,
            },
            capture_backtrace: true,
        }
    }
}

/// Splits a `host:port` endpoint string, validating the port.
pub fn parse_endpoint(endpoint: &str) -> Result<(&str, u16), ConfigurationError> {
    let malformed = || ConfigurationError::InvalidEndpoint(endpoint.to_string());
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(malformed)?;
    if host.is_empty() {
        return Err(malformed());
    }
    let port: u16 = port.parse().map_err(|_| malformed())?;
    Ok((host, port))
}

/// Syntactic validation of a mail address: one `@`, a non-empty local part,
/// a dotted domain, no whitespace or control characters. Deliberately far
/// short of full RFC 5322; it catches the configuration typos that matter.
pub fn parse_mail_address(address: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: &'static str| ConfigurationError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("contains whitespace or control characters"));
    }
    let (local, domain) = address.split_once('@').ok_or_else(|| invalid("missing @"))?;
    if local.is_empty() {
        return Err(invalid("empty local part"));
    }
    if domain.contains('@') {
        return Err(invalid("multiple @ signs"));
    }
    if domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.')
    {
        return Err(invalid("malformed domain"));
    }
    Ok(())
}
