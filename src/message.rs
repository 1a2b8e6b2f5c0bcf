//! Builds the plain-text mail payload for one log record.

use crate::core::LogRecord;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use serde::Serialize;
use std::backtrace::Backtrace;

/// Fixed timestamp layout used in the mail body, e.g.
/// `2026-08-23 14:02:11+0000`.
const BODY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// A composed mail payload: subject plus body, no MIME, no attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// The SMTP DATA wire form: `Subject: <subject>\r\n\r\n<body>`.
    pub fn to_wire(&self) -> String {
        format!("Subject: {}\r\n\r\n{}", self.subject, self.body)
    }
}

/// Pure transformation from a record and an application name to a mail
/// payload. Holds only the settings that shape the body.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    app_name: String,
    capture_backtrace: bool,
}

impl MessageComposer {
    pub fn new(app_name: impl Into<String>, capture_backtrace: bool) -> Self {
        Self {
            app_name: app_name.into(),
            capture_backtrace,
        }
    }

    /// Composes the subject (`"<app> - <severity>"`) and body for `record`.
    ///
    /// The stack trace is captured on every composition regardless of
    /// severity, matching the behavior this crate replaces; set
    /// `capture_backtrace` to false to skip the (expensive) capture.
    pub fn compose(&self, record: &LogRecord) -> MailMessage {
        let subject = format!("{} - {}", self.app_name, record.severity);
        let stack = if self.capture_backtrace {
            Backtrace::force_capture().to_string()
        } else {
            String::new()
        };
        let body = format!(
            "TIME: {}\nMESSAGE: {}\n\nDATA: {}\n\nSTACKTRACE: \n{}",
            record.timestamp.format(BODY_TIME_FORMAT),
            record.message,
            render_fields(record),
            stack,
        );
        MailMessage { subject, body }
    }
}

/// Renders the structured field map as tab-indented JSON.
///
/// Malformed field data degrades to a best-effort `Debug` rendering rather
/// than aborting the whole send.
fn render_fields(record: &LogRecord) -> String {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    match record.fields.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(out).unwrap_or_else(|_| format!("{:?}", record.fields)),
        Err(_) => format!("{:?}", record.fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogRecord, Severity};
    use chrono::TimeZone;

    fn sample_record() -> LogRecord {
        let mut record = LogRecord::new(Severity::Error, "replication stalled")
            .with_field("user", "a")
            .with_field("count", 3);
        record.timestamp = chrono::Utc.with_ymd_and_hms(2026, 8, 23, 14, 2, 11).unwrap();
        record
    }

    #[test]
    fn subject_is_app_dash_severity() {
        let composer = MessageComposer::new("svc", false);
        let message = composer.compose(&sample_record());
        assert_eq!(message.subject, "svc - error");
    }

    #[test]
    fn body_carries_time_message_and_fields() {
        let composer = MessageComposer::new("svc", false);
        let message = composer.compose(&sample_record());

        assert!(message.body.contains("TIME: 2026-08-23 14:02:11+0000"));
        assert!(message.body.contains("MESSAGE: replication stalled"));
        assert!(message.body.contains("\"user\": \"a\""));
        assert!(message.body.contains("\"count\": 3"));
        assert!(message.body.contains("STACKTRACE: \n"));
    }

    #[test]
    fn backtrace_is_captured_when_enabled() {
        let composer = MessageComposer::new("svc", true);
        let message = composer.compose(&sample_record());
        // The capture is platform dependent; it is enough that the section
        // is non-empty.
        let stack = message.body.split("STACKTRACE: \n").nth(1).unwrap();
        assert!(!stack.is_empty());
    }

    #[test]
    fn wire_form_separates_subject_and_body() {
        let message = MailMessage {
            subject: "svc - warn".to_string(),
            body: "TIME: x\nMESSAGE: y".to_string(),
        };
        assert_eq!(message.to_wire(), "Subject: svc - warn\r\n\r\nTIME: x\nMESSAGE: y");
    }

    #[test]
    fn empty_field_map_renders_as_empty_object() {
        let mut record = sample_record();
        record.fields.clear();
        let composer = MessageComposer::new("svc", false);
        let message = composer.compose(&record);
        assert!(message.body.contains("DATA: {}"));
    }
}
