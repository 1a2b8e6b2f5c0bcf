//! Core domain types and the sink contract for logalert
//!
//! This module defines the record abstraction consumed from the host logging
//! framework and the trait contract every delivery sink implements.

use crate::errors::{ConfigurationError, DeliveryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Severity {
    /// The lowercase name of the severity, as used in subjects and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::Panic => "panic",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            // "warning" is the spelling some frameworks emit for warn.
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            "panic" => Ok(Severity::Panic),
            other => Err(ConfigurationError::InvalidLevel(other.to_string())),
        }
    }
}

/// A log record as consumed from the host logging framework.
///
/// Records are read-only from this crate's perspective: sinks format and
/// deliver them but never mutate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Severity of the event.
    pub severity: Severity,
    /// The message text. Also used as the per-message suppression key.
    pub message: String,
    /// Structured fields attached to the record. Insertion order is
    /// irrelevant for routing and suppression.
    pub fields: Map<String, Value>,
    /// When the record was emitted.
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Creates a record with the current time and no fields.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            fields: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attaches a structured field, builder style.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A set of severities for which a sink fires, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeveritySet(u8);

impl SeveritySet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The alerting set: {warn, error, fatal, panic}. Both the mail and
    /// console sinks fire only for these; lower severities pass through to
    /// the primary log output alone.
    pub const fn alerts() -> Self {
        Self::empty()
            .with(Severity::Warn)
            .with(Severity::Error)
            .with(Severity::Fatal)
            .with(Severity::Panic)
    }

    /// Returns a copy of the set with `severity` added.
    pub const fn with(self, severity: Severity) -> Self {
        Self(self.0 | (1u8 << severity as u8))
    }

    /// Builds a set from a slice of severities.
    pub fn from_slice(severities: &[Severity]) -> Self {
        severities.iter().fold(Self::empty(), |set, s| set.with(*s))
    }

    /// Whether the set contains `severity`.
    pub const fn contains(&self, severity: Severity) -> bool {
        self.0 & (1u8 << severity as u8) != 0
    }
}

/// A delivery target for log records.
#[async_trait]
pub trait Sink: Send + Sync {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// The severities for which this sink fires.
    fn severities(&self) -> SeveritySet;

    /// Delivers one record.
    ///
    /// A suppressed alert is a successful no-op, not an error. Errors are
    /// reported by the dispatcher and never reach the emitting call.
    async fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError>;
}
