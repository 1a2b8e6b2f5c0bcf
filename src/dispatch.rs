//! Routes emitted records to their eligible sinks.
//!
//! Dispatch runs sequentially on the emitting call, in fixed registration
//! order, and completes only when every eligible sink has run. A sink error
//! is reported through this crate's tracing channel and never propagates
//! back to the caller; one sink failing does not stop the others.

use crate::core::{LogRecord, Sink};
use tracing::error;

/// An ordered set of registered sinks.
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Appends a sink. Invocation order follows registration order.
    pub fn register(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Builder-style registration.
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.register(sink);
        self
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Invokes every sink whose severity set contains the record's severity.
    ///
    /// Blocks the emitting call until all eligible sinks have run, including
    /// any SMTP round-trip. There is no queueing and no background work.
    pub async fn dispatch(&self, record: &LogRecord) {
        for sink in &self.sinks {
            if !sink.severities().contains(record.severity) {
                continue;
            }
            if let Err(e) = sink.deliver(record).await {
                metrics::counter!("sink_delivery_failures", "sink" => sink.name().to_string())
                    .increment(1);
                error!(sink = sink.name(), error = %e, "sink delivery failed");
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|sink| sink.name()).collect();
        f.debug_struct("Dispatcher").field("sinks", &names).finish()
    }
}
