//! SMTP delivery over a plain TCP connection.
//!
//! One fresh connection per send, no pooling, no retries. Endpoint
//! reachability and address syntax are validated once at construction time;
//! a send-time failure is still possible and propagates to the caller as a
//! [`DeliveryError`].

use crate::config::{parse_endpoint, parse_mail_address};
use crate::errors::{ConfigurationError, DeliveryError};
use crate::message::MailMessage;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// How long the construction-time reachability probe waits for the endpoint
/// to accept a TCP connection.
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Hostname announced in the EHLO greeting.
const CLIENT_NAME: &str = "localhost";

/// Plain-text credentials for the authenticated variant.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The password stays out of logs and test failure output.
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Anything that can deliver a composed mail payload. The production
/// implementation is [`MailTransport`]; tests substitute a fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError>;
}

/// SMTP client bound to one `host:port`, sender, and recipient.
///
/// With credentials configured, an `AUTH PLAIN` exchange precedes the
/// envelope commands; otherwise the session is unauthenticated. Either way
/// the envelope is the same: `MAIL FROM` -> `RCPT TO` -> `DATA`.
#[derive(Debug)]
pub struct MailTransport {
    endpoint: String,
    sender: String,
    recipient: String,
    credentials: Option<Credentials>,
}

impl MailTransport {
    /// Validates the configuration and builds a transport.
    ///
    /// Fails fast with a descriptive error if the endpoint string is
    /// malformed, either address is syntactically invalid, or the endpoint
    /// does not accept a TCP connection within [`REACHABILITY_TIMEOUT`].
    /// Passing these checks does not guarantee a later send will succeed;
    /// send-time failures surface through [`Transport::send`].
    pub async fn new(
        endpoint: &str,
        sender: &str,
        recipient: &str,
        credentials: Option<Credentials>,
    ) -> Result<Self, ConfigurationError> {
        parse_endpoint(endpoint)?;
        parse_mail_address(sender)?;
        parse_mail_address(recipient)?;

        let probe = tokio::time::timeout(REACHABILITY_TIMEOUT, TcpStream::connect(endpoint))
            .await
            .map_err(|_| ConfigurationError::Unreachable {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?;
        // The probe connection is dropped immediately; sends open their own.
        probe.map_err(|source| ConfigurationError::Unreachable {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl Transport for MailTransport {
    /// Performs one complete SMTP transaction.
    ///
    /// Any step failure aborts the send; the connection is closed on every
    /// exit path when the session is dropped. There is deliberately no
    /// timeout on the data-transfer phase, so a hung server can stall the
    /// emitting call.
    #[instrument(skip(self, message), fields(endpoint = %self.endpoint))]
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|source| DeliveryError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let mut session = SmtpSession::start(stream).await?;
        if let Some(credentials) = &self.credentials {
            session.auth_plain(credentials).await?;
        }
        session
            .command("MAIL FROM", &format!("MAIL FROM:<{}>", self.sender), 250)
            .await?;
        session
            .command("RCPT TO", &format!("RCPT TO:<{}>", self.recipient), 250)
            .await?;
        session.data(&message.to_wire()).await?;
        session.quit().await;

        debug!("mail accepted by server");
        Ok(())
    }
}

/// One live SMTP session. Dropping it closes the connection.
struct SmtpSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl SmtpSession {
    /// Consumes the server greeting and introduces the client.
    async fn start(stream: TcpStream) -> Result<Self, DeliveryError> {
        let (read_half, write_half) = stream.into_split();
        let mut session = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        };
        session.expect("greeting", 220).await?;
        session
            .command("EHLO", &format!("EHLO {}", CLIENT_NAME), 250)
            .await?;
        Ok(session)
    }

    /// Sends the PLAIN initial response: base64 of `\0user\0pass`.
    async fn auth_plain(&mut self, credentials: &Credentials) -> Result<(), DeliveryError> {
        let raw = format!("\0{}\0{}", credentials.username, credentials.password);
        let line = format!("AUTH PLAIN {}", BASE64.encode(raw.as_bytes()));
        self.write_line(&line).await?;
        let (code, text) = self.read_reply().await?;
        if code != 235 {
            return Err(DeliveryError::AuthRejected { code, text });
        }
        Ok(())
    }

    /// Writes one command line and checks the reply code.
    async fn command(
        &mut self,
        name: &'static str,
        line: &str,
        expected: u16,
    ) -> Result<(), DeliveryError> {
        self.write_line(line).await?;
        self.expect(name, expected).await
    }

    /// Issues DATA and streams the dot-stuffed payload.
    async fn data(&mut self, payload: &str) -> Result<(), DeliveryError> {
        self.command("DATA", "DATA", 354).await?;
        for line in payload.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            // A leading dot is doubled so the server does not read it as
            // end-of-data.
            if line.starts_with('.') {
                self.writer.write_all(b".").await?;
            }
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.write_all(b".\r\n").await?;
        self.writer.flush().await?;
        self.expect("DATA body", 250).await
    }

    /// Says goodbye. The server's answer no longer matters: the payload was
    /// already accepted, so failures here are ignored.
    async fn quit(mut self) {
        let _ = self.write_line("QUIT").await;
        let _ = self.read_reply().await;
    }

    async fn write_line(&mut self, line: &str) -> Result<(), DeliveryError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn expect(&mut self, command: &'static str, expected: u16) -> Result<(), DeliveryError> {
        let (code, text) = self.read_reply().await?;
        if code != expected {
            return Err(DeliveryError::UnexpectedReply { command, code, text });
        }
        Ok(())
    }

    /// Reads one (possibly multiline) reply and returns its code and text.
    async fn read_reply(&mut self) -> Result<(u16, String), DeliveryError> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(DeliveryError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid-reply",
                )));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            let malformed = || {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("malformed smtp reply line: {line:?}"),
                )
            };
            // Checked slicing: a reply short on bytes, non-numeric, or with
            // a multibyte character straddling the slice point is a protocol
            // error, never a panic.
            let code: u16 = line
                .get(..3)
                .and_then(|digits| digits.parse().ok())
                .ok_or_else(malformed)?;
            if line.len() > 4 {
                let rest = line.get(4..).ok_or_else(malformed)?;
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(rest);
            }
            // A hyphen after the code marks a continuation line.
            if line.len() == 3 || line.as_bytes()[3] != b'-' {
                return Ok((code, text));
            }
        }
    }
}
