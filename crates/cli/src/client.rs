// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use slotq_daemon::protocol::{self, ErrorKind, ProtocolError};
use slotq_daemon::{Request, Response};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

/// Deadline for a publish round trip
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

/// First retry delay when the daemon is not reachable yet
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for unary requests (ping, status, shutdown)
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("SLOTQ_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Total time spent retrying the initial connection
pub fn timeout_connect() -> Duration {
    parse_duration_ms("SLOTQ_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(30))
}

/// Delay before connection attempt `attempt` (0-based): doubles, capped at `max`
pub fn backoff_delay(attempt: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
    INITIAL_BACKOFF.saturating_mul(factor).min(max)
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not reachable at {addr}: {source}")]
    DaemonNotRunning {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected ({kind:?}): {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,
}

impl ClientError {
    fn from_response(response: Response) -> Self {
        match response {
            Response::Error { kind, message } => ClientError::Rejected { kind, message },
            _ => ClientError::UnexpectedResponse,
        }
    }
}

/// Acknowledgement of a published record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub offset: u64,
    pub next_offset: u64,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "published at offset {} (log ends at {})",
            self.offset, self.next_offset
        )
    }
}

/// Daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub uptime_secs: u64,
    pub slot_size: u32,
    pub next_offset: u64,
    pub records: u64,
    pub consumers: usize,
}

impl fmt::Display for StatusInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uptime:      {}s", self.uptime_secs)?;
        writeln!(f, "slot size:   {} bytes", self.slot_size)?;
        writeln!(f, "records:     {}", self.records)?;
        writeln!(f, "next offset: {}", self.next_offset)?;
        write!(f, "consumers:   {}", self.consumers)
    }
}

/// A record received on a consume stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedRecord {
    pub data: Vec<u8>,
    pub offset: u64,
    pub next_offset: u64,
}

/// Open consume stream. Dropping it disconnects, which ends the tail.
pub struct Consumer {
    stream: TcpStream,
}

impl Consumer {
    /// Wait for the next record.
    ///
    /// The daemon ends a stream with an error frame; that arrives here as
    /// `ClientError::Rejected`.
    pub async fn next(&mut self) -> Result<StreamedRecord, ClientError> {
        let bytes = protocol::read_message(&mut self.stream).await?;
        match protocol::decode::<Response>(&bytes)? {
            Response::Record {
                data,
                offset,
                next_offset,
            } => Ok(StreamedRecord {
                data,
                offset,
                next_offset,
            }),
            other => Err(ClientError::from_response(other)),
        }
    }
}

/// Daemon client
pub struct DaemonClient {
    addr: String,
    max_backoff: Duration,
}

impl DaemonClient {
    pub fn new(addr: impl Into<String>, max_backoff: Duration) -> Self {
        Self {
            addr: addr.into(),
            max_backoff,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Connect, retrying with capped exponential backoff until `timeout_connect()`
    async fn connect(&self) -> Result<TcpStream, ClientError> {
        let start = Instant::now();
        let mut attempt = 0;
        loop {
            match TcpStream::connect(&self.addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    let delay = backoff_delay(attempt, self.max_backoff);
                    if start.elapsed() + delay > timeout_connect() {
                        return Err(ClientError::DaemonNotRunning {
                            addr: self.addr.clone(),
                            source: e,
                        });
                    }
                    debug!(addr = %self.addr, attempt, "connect failed, retrying in {:?}: {}", delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = self.connect().await?;
        let (mut reader, mut writer) = stream.into_split();

        // Encode and send request with write timeout
        let data = protocol::encode(&request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        // Read response with read timeout
        let response_bytes =
            tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
    }

    /// Check the daemon is alive
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Append one record
    pub async fn publish(&self, data: Vec<u8>) -> Result<Ack, ClientError> {
        match self
            .send_with_timeout(Request::Publish { data }, PUBLISH_TIMEOUT, PUBLISH_TIMEOUT)
            .await?
        {
            Response::Published {
                offset,
                next_offset,
            } => Ok(Ack {
                offset,
                next_offset,
            }),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Open a consume stream starting at `offset`
    pub async fn consume(&self, offset: u64) -> Result<Consumer, ClientError> {
        let mut stream = self.connect().await?;
        let data = protocol::encode(&Request::Consume { offset })?;
        tokio::time::timeout(timeout_ipc(), protocol::write_message(&mut stream, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(Consumer { stream })
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<StatusInfo, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                slot_size,
                next_offset,
                records,
                consumers,
            } => Ok(StatusInfo {
                uptime_secs,
                slot_size,
                next_offset,
                records,
                consumers,
            }),
            other => Err(ClientError::from_response(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(ClientError::from_response(other)),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
