//! End-to-end dispatch: console mirror plus mail sink against a mock SMTP
//! server.

mod helpers;

use helpers::mock_smtp::MockSmtpServer;
use logalert::config::MarkPolicy;
use logalert::console::ConsoleMirror;
use logalert::core::{LogRecord, Severity};
use logalert::dispatch::Dispatcher;
use logalert::mail::MailSink;
use logalert::message::MessageComposer;
use logalert::suppression::SuppressionStore;
use logalert::transport::MailTransport;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// In-memory stand-in for stderr.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

async fn build_pipeline(server: &MockSmtpServer) -> (Dispatcher, SharedBuffer) {
    // Sink failures are reported through tracing; make them visible when a
    // test runs with RUST_LOG set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let transport = MailTransport::new(
        &server.endpoint(),
        "alerts@example.com",
        "oncall@example.com",
        None,
    )
    .await
    .unwrap();

    let console_buffer = SharedBuffer::default();
    let dispatcher = Dispatcher::new()
        .with_sink(Box::new(ConsoleMirror::with_writer(
            Box::new(console_buffer.clone()),
            false,
        )))
        .with_sink(Box::new(MailSink::new(
            MessageComposer::new("svc", false),
            Box::new(transport),
            Arc::new(SuppressionStore::new()),
            MarkPolicy::BeforeSend,
        )));
    (dispatcher, console_buffer)
}

#[tokio::test]
async fn warn_record_reaches_both_sinks() {
    let server = MockSmtpServer::start().await;
    let (dispatcher, console) = build_pipeline(&server).await;

    let record = LogRecord::new(Severity::Warn, "pool exhausted").with_field("pool", "primary");
    dispatcher.dispatch(&record).await;

    assert!(console.contents().contains("msg=\"pool exhausted\""));
    let messages = server.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Subject: svc - warn\r\n"));
}

#[tokio::test]
async fn info_record_reaches_neither_sink() {
    let server = MockSmtpServer::start().await;
    let (dispatcher, console) = build_pipeline(&server).await;

    dispatcher
        .dispatch(&LogRecord::new(Severity::Info, "routine"))
        .await;

    assert!(console.contents().is_empty());
    assert!(server.messages().is_empty());
}

#[tokio::test]
async fn repeated_message_is_mailed_once_but_mirrored_every_time() {
    let server = MockSmtpServer::start().await;
    let (dispatcher, console) = build_pipeline(&server).await;

    let record = LogRecord::new(Severity::Error, "disk full");
    dispatcher.dispatch(&record).await;
    dispatcher.dispatch(&record).await;

    // The console mirror has no suppression; the mail sink does.
    assert_eq!(console.contents().matches("msg=\"disk full\"").count(), 2);
    assert_eq!(server.messages().len(), 1);
}

#[tokio::test]
async fn different_messages_inside_the_global_window_yield_one_mail() {
    let server = MockSmtpServer::start().await;
    let (dispatcher, _console) = build_pipeline(&server).await;

    dispatcher
        .dispatch(&LogRecord::new(Severity::Error, "disk full"))
        .await;
    dispatcher
        .dispatch(&LogRecord::new(Severity::Error, "cpu on fire"))
        .await;

    // The second message has an untouched per-message window but trips the
    // global throttle.
    assert_eq!(server.messages().len(), 1);
}
