//! The mail alert sink: suppression check, composition, SMTP delivery.

use crate::config::MarkPolicy;
use crate::core::{LogRecord, SeveritySet, Sink};
use crate::errors::DeliveryError;
use crate::message::MessageComposer;
use crate::suppression::SuppressionStore;
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Sends throttled mail alerts for warn-and-above records.
pub struct MailSink {
    composer: MessageComposer,
    transport: Box<dyn Transport>,
    suppression: Arc<SuppressionStore>,
    mark_policy: MarkPolicy,
}

impl MailSink {
    pub fn new(
        composer: MessageComposer,
        transport: Box<dyn Transport>,
        suppression: Arc<SuppressionStore>,
        mark_policy: MarkPolicy,
    ) -> Self {
        Self {
            composer,
            transport,
            suppression,
            mark_policy,
        }
    }
}

#[async_trait]
impl Sink for MailSink {
    fn name(&self) -> &str {
        "mail"
    }

    fn severities(&self) -> SeveritySet {
        SeveritySet::alerts()
    }

    /// Delivers one alert, unless throttled.
    ///
    /// Under the default `before_send` policy the suppression keys are
    /// stamped before the network transaction, so a failed send still
    /// consumes the window. That keeps repeated failures from hammering a
    /// mail server that may be down, at the cost of silently losing the
    /// alert. `after_send` stamps only on confirmed delivery.
    async fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        if !self.suppression.can_send_alert(record) {
            debug!(message = %record.message, "alert suppressed");
            return Ok(());
        }

        if self.mark_policy == MarkPolicy::BeforeSend {
            self.suppression.mark_sent(record);
        }

        let message = self.composer.compose(record);
        self.transport.send(&message).await?;

        if self.mark_policy == MarkPolicy::AfterSend {
            self.suppression.mark_sent(record);
        }
        metrics::counter!("alerts_mailed").increment(1);
        Ok(())
    }
}
