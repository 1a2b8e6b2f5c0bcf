//! A mock SMTP server for testing mail delivery integration.
//!
//! Speaks just enough of the protocol for one client: greeting, EHLO,
//! optional AUTH PLAIN, envelope commands, and DATA capture. Connections are
//! handled sequentially; a connection that closes without issuing commands
//! (the reachability probe) is tolerated.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the mock responds to the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Accept everything.
    Accept,
    /// Refuse `RCPT TO` with a 550.
    RejectRcpt,
    /// Refuse `AUTH PLAIN` with a 535.
    RejectAuth,
}

#[derive(Default)]
struct ServerLog {
    commands: Vec<String>,
    messages: Vec<String>,
}

pub struct MockSmtpServer {
    addr: SocketAddr,
    log: Arc<Mutex<ServerLog>>,
    _handle: JoinHandle<()>,
}

impl MockSmtpServer {
    pub async fn start() -> Self {
        Self::start_with(Behavior::Accept).await
    }

    pub async fn start_with(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(ServerLog::default()));
        let server_log = log.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let _ = handle_connection(stream, behavior, server_log.clone()).await;
            }
        });

        Self {
            addr,
            log,
            _handle: handle,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }

    /// Every command line the server has seen, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().commands.clone()
    }

    /// Raw DATA payloads, one string per accepted message, CRLF line
    /// endings preserved.
    pub fn messages(&self) -> Vec<String> {
        self.log.lock().unwrap().messages.clone()
    }
}

async fn handle_connection(
    stream: TcpStream,
    behavior: Behavior,
    log: Arc<Mutex<ServerLog>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(b"220 mock ESMTP\r\n").await?;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            // Reachability probes connect and hang up without a word.
            return Ok(());
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        log.lock().unwrap().commands.push(line.clone());
        let upper = line.to_ascii_uppercase();

        if upper.starts_with("EHLO") || upper.starts_with("HELO") {
            write_half
                .write_all(b"250-mock greets you\r\n250 AUTH PLAIN\r\n")
                .await?;
        } else if upper.starts_with("AUTH PLAIN") {
            if behavior == Behavior::RejectAuth {
                write_half
                    .write_all(b"535 5.7.8 authentication failed\r\n")
                    .await?;
            } else {
                write_half.write_all(b"235 2.7.0 accepted\r\n").await?;
            }
        } else if upper.starts_with("MAIL FROM") {
            write_half.write_all(b"250 2.1.0 ok\r\n").await?;
        } else if upper.starts_with("RCPT TO") {
            if behavior == Behavior::RejectRcpt {
                write_half.write_all(b"550 5.1.1 no such user\r\n").await?;
            } else {
                write_half.write_all(b"250 2.1.5 ok\r\n").await?;
            }
        } else if upper == "DATA" {
            write_half
                .write_all(b"354 end data with <CRLF>.<CRLF>\r\n")
                .await?;
            let mut payload = String::new();
            loop {
                let mut data_line = String::new();
                if reader.read_line(&mut data_line).await? == 0 {
                    return Ok(());
                }
                if data_line == ".\r\n" || data_line == ".\n" {
                    break;
                }
                payload.push_str(&data_line);
            }
            log.lock().unwrap().messages.push(payload);
            write_half.write_all(b"250 2.0.0 queued\r\n").await?;
        } else if upper == "QUIT" {
            write_half.write_all(b"221 2.0.0 bye\r\n").await?;
            return Ok(());
        } else {
            write_half.write_all(b"500 unrecognized\r\n").await?;
        }
    }
}
