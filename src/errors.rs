//! Error taxonomy for setup and delivery.
//!
//! Two families: `ConfigurationError` fails setup immediately and is surfaced
//! to the caller; `DeliveryError` is recovered by the dispatcher at send time
//! and never propagates back to the emitting log call.

use thiserror::Error;

/// A setup-time validation failure. No partial setup is left active when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The `host:port` endpoint string could not be parsed.
    #[error("malformed mail endpoint {0:?}, expected host:port")]
    InvalidEndpoint(String),

    /// An unknown severity name was supplied.
    #[error("unknown severity level {0:?}")]
    InvalidLevel(String),

    /// An unknown output format was supplied.
    #[error("unknown output format {0:?}, expected \"json\" or \"text\"")]
    InvalidFormat(String),

    /// A sender or recipient address failed syntactic validation.
    #[error("invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    /// The mail endpoint did not accept a TCP connection within the
    /// reachability timeout.
    #[error("mail endpoint {endpoint} unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// A failure during one SMTP delivery attempt. There are no retries; a single
/// failed attempt is the final outcome for that record.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connecting to the SMTP server failed at send time.
    #[error("connecting to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The server answered a command with an unexpected reply code.
    #[error("{command} rejected: {code} {text}")]
    UnexpectedReply {
        command: &'static str,
        code: u16,
        text: String,
    },

    /// The server rejected the PLAIN authentication exchange.
    #[error("authentication rejected: {code} {text}")]
    AuthRejected { code: u16, text: String },

    /// An I/O error on the established connection.
    #[error("smtp i/o error: {0}")]
    Io(#[from] std::io::Error),
}
