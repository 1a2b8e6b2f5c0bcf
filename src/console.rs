//! Re-emits high-severity records to the error console.
//!
//! This is a best-effort diagnostic side channel, independent of mail
//! delivery: a write failure is swallowed, never reported as a sink error.

use crate::core::{LogRecord, SeveritySet, Sink};
use crate::errors::DeliveryError;
use crate::formatting::{RecordFormatter, TextRecordFormatter};
use async_trait::async_trait;
use std::backtrace::Backtrace;
use std::io::Write;
use std::sync::Mutex;

/// Writes formatted warn-and-above records, each followed by a stack trace,
/// to the process error stream.
pub struct ConsoleMirror {
    formatter: Box<dyn RecordFormatter>,
    writer: Mutex<Box<dyn Write + Send>>,
    capture_backtrace: bool,
}

impl ConsoleMirror {
    /// A mirror writing to stderr with the single-line text layout.
    pub fn new(capture_backtrace: bool) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), capture_backtrace)
    }

    /// A mirror writing to an arbitrary sink, for tests.
    pub fn with_writer(writer: Box<dyn Write + Send>, capture_backtrace: bool) -> Self {
        Self {
            formatter: Box::new(TextRecordFormatter),
            writer: Mutex::new(writer),
            capture_backtrace,
        }
    }
}

#[async_trait]
impl Sink for ConsoleMirror {
    fn name(&self) -> &str {
        "console"
    }

    fn severities(&self) -> SeveritySet {
        SeveritySet::alerts()
    }

    async fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let line = self.formatter.format_record(record);
        let stack = if self.capture_backtrace {
            Backtrace::force_capture().to_string()
        } else {
            String::new()
        };

        let mut writer = self.writer.lock().expect("console writer lock poisoned");
        // Best effort: the record and its stack trace, trailing newline, no
        // further framing.
        let _ = writeln!(writer, "{}\n{}", line, stack);
        let _ = writer.flush();
        Ok(())
    }
}
