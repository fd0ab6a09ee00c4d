use crate::config::DriverConfig;
use crate::error::{OppoError, Result};
use crate::protocol::{self, ParsedResponse};
use crate::types::DeviceAddress;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Line terminator expected by the player
const TERMINATOR: &str = "\r";

/// Outcome of a successful round-trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command written, no response requested
    Sent,
    /// Response text, decoded and trimmed
    Text(String),
}

/// One-shot command transport
///
/// The player reliably honours only one command per TCP session, so every
/// call opens a fresh connection, writes a single line, optionally reads a
/// single reply, and closes. The stream is owned by the call and dropped on
/// every exit path.
#[derive(Debug, Clone)]
pub struct Connection {
    address: DeviceAddress,
    connect_timeout: Duration,
    write_timeout: Duration,
    read_timeout: Duration,
    read_buffer_size: usize,
}

impl Connection {
    pub fn new(address: DeviceAddress, config: &DriverConfig) -> Self {
        Self {
            address,
            connect_timeout: config.connect_timeout,
            write_timeout: config.write_timeout,
            read_timeout: config.read_timeout,
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }

    /// Get the player address
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Run one command round-trip
    pub async fn execute(&self, command: &str, expect_response: bool) -> Result<Reply> {
        tracing::debug!("Sending {:?} to {}", command, self.address);

        let mut stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.address.host(), self.address.port())),
        )
        .await
        .map_err(|_| OppoError::ConnectTimeout)??;

        let line = format!("{}{}", command, TERMINATOR);
        timeout(self.write_timeout, async {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|_| OppoError::WriteTimeout)??;

        if !expect_response {
            let _ = stream.shutdown().await;
            return Ok(Reply::Sent);
        }

        let mut buf = vec![0u8; self.read_buffer_size];
        let n = timeout(self.read_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| OppoError::ReadTimeout)??;

        let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        tracing::debug!("Received {:?} for {:?}", text, command);

        let _ = stream.shutdown().await;
        Ok(Reply::Text(text))
    }

    /// Send a command without waiting for a reply (fire and forget)
    pub async fn send(&self, command: &str) -> Result<()> {
        self.execute(command, false).await.map(|_| ())
    }

    /// Send a command and decode its reply
    pub async fn request(&self, command: &str) -> Result<ParsedResponse> {
        match self.execute(command, true).await? {
            Reply::Text(text) => Ok(protocol::parse(&text)),
            Reply::Sent => Ok(ParsedResponse::Empty),
        }
    }
}
