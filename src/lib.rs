//! logalert - severity-routed log dispatch with throttled mail alerting
//!
//! This library sits between a host logging framework and its delivery
//! sinks: every emitted record is routed by severity to a stderr console
//! mirror and a throttled SMTP mail sink. The host framework stays external;
//! this crate consumes its record abstraction and produces formatted
//! payloads.

pub mod config;
pub mod console;
pub mod core;
pub mod dispatch;
pub mod errors;
pub mod formatting;
pub mod mail;
pub mod message;
pub mod suppression;
pub mod transport;

// Re-export the types most consumers need.
pub use crate::config::{Config, MarkPolicy, OutputFormat};
pub use crate::core::{LogRecord, Severity, SeveritySet, Sink};
pub use crate::dispatch::Dispatcher;
pub use crate::errors::{ConfigurationError, DeliveryError};

use crate::console::ConsoleMirror;
use crate::formatting::{JsonRecordFormatter, RecordFormatter, TextRecordFormatter};
use crate::mail::MailSink;
use crate::message::MessageComposer;
use crate::suppression::SuppressionStore;
use crate::transport::{Credentials, MailTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything the host logger needs after setup: the dispatcher to forward
/// records into, plus the stream settings to apply to the primary output.
#[derive(Debug)]
pub struct LoggerSetup {
    /// Routes records to the console and mail sinks. The host's event
    /// callback forwards each emitted record here.
    pub dispatcher: Dispatcher,
    /// Minimum severity the host logger should emit.
    pub min_level: Severity,
    /// Formatter the host logger should select for the primary output.
    pub format: OutputFormat,
}

impl LoggerSetup {
    /// The record formatter for the primary output, matching the configured
    /// format: structured JSON lines or the single-line text layout.
    pub fn formatter(&self) -> Box<dyn RecordFormatter> {
        match self.format {
            OutputFormat::Json => Box::new(JsonRecordFormatter),
            OutputFormat::Text => Box::new(TextRecordFormatter),
        }
    }
}

/// One-call setup: validates every parameter, builds both sinks, and
/// returns the dispatcher together with the host-facing stream settings.
///
/// Failure conditions, each surfaced immediately with no partial setup left
/// active: malformed `host:port` endpoint, unknown output format, unknown
/// severity name, unreachable mail endpoint, malformed sender or recipient
/// address.
pub async fn setup(
    mail_endpoint: &str,
    format: &str,
    level: &str,
    app_name: &str,
    sender: &str,
    recipient: &str,
) -> Result<LoggerSetup, ConfigurationError> {
    let format: OutputFormat = format.parse()?;
    let min_level: Severity = level.parse()?;

    let mut config = Config::default();
    config.mail.endpoint = mail_endpoint.to_string();
    config.mail.app_name = app_name.to_string();
    config.mail.sender = sender.to_string();
    config.mail.recipient = recipient.to_string();

    let dispatcher = build_dispatcher(&config).await?;

    info!(
        endpoint = mail_endpoint,
        app = app_name,
        %min_level,
        "alert dispatch configured"
    );

    Ok(LoggerSetup {
        dispatcher,
        min_level,
        format,
    })
}

/// Builds the dispatcher from a full [`Config`]: console mirror first, mail
/// sink second, so the local diagnostic write always precedes the network
/// round-trip.
pub async fn build_dispatcher(config: &Config) -> Result<Dispatcher, ConfigurationError> {
    let credentials = match (&config.mail.username, &config.mail.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let transport = MailTransport::new(
        &config.mail.endpoint,
        &config.mail.sender,
        &config.mail.recipient,
        credentials,
    )
    .await?;

    let suppression = Arc::new(SuppressionStore::with_windows(
        Duration::from_secs(config.suppression.global_window_seconds),
        Duration::from_secs(config.suppression.message_window_seconds),
    ));
    let composer = MessageComposer::new(&config.mail.app_name, config.capture_backtrace);

    Ok(Dispatcher::new()
        .with_sink(Box::new(ConsoleMirror::new(config.capture_backtrace)))
        .with_sink(Box::new(MailSink::new(
            composer,
            Box::new(transport),
            suppression,
            config.mail.mark_policy,
        ))))
}
