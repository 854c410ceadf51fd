// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between slotq clients and the daemon.
//!
//! Every message is a 4-byte big-endian length followed by a JSON document.
//! Unary requests get exactly one response. `Consume` gets a stream of
//! `Record` responses that ends with one `Error` (unless the client hung up).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slotq_storage::LogError;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version reported in `Hello`
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bound on reading a request or writing a unary response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on writing one record of a consume stream; slower consumers are dropped
pub const STREAM_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest frame either side will accept
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Client requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello { version: String },
    /// Append one record
    Publish { data: Vec<u8> },
    /// Stream records from `offset`, following appends
    Consume { offset: u64 },
    Status,
    Shutdown,
}

/// Daemon responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello {
        version: String,
    },
    /// The record starts at `offset`; the log now ends at `next_offset`
    Published {
        offset: u64,
        next_offset: u64,
    },
    Record {
        data: Vec<u8>,
        offset: u64,
        next_offset: u64,
    },
    Status {
        uptime_secs: u64,
        slot_size: u32,
        next_offset: u64,
        records: u64,
        consumers: usize,
    },
    ShuttingDown,
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn error(err: &LogError) -> Self {
        Response::Error {
            kind: ErrorKind::from(err),
            message: err.to_string(),
        }
    }
}

/// Failure classes reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PayloadTooLarge,
    InvalidOffset,
    ShortWrite,
    ShortRead,
    Cancelled,
    Io,
    BadRequest,
}

impl From<&LogError> for ErrorKind {
    fn from(err: &LogError) -> Self {
        match err {
            LogError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            LogError::InvalidOffset { .. } => ErrorKind::InvalidOffset,
            LogError::ShortWrite { .. } => ErrorKind::ShortWrite,
            LogError::ShortRead { .. } => ErrorKind::ShortRead,
            LogError::Cancelled(_) => ErrorKind::Cancelled,
            LogError::Io(_) | LogError::InvalidSlotSize | LogError::MisalignedLog { .. } => {
                ErrorKind::Io
            }
        }
    }
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Message of {0} bytes exceeds limit")]
    MessageTooLarge(usize),
}

/// Serialize a message to JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Deserialize a message from JSON
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(data.len()));
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(len));
    }

    let mut data = vec![0u8; len];
    match reader.read_exact(&mut data).await {
        Ok(_) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read and decode a request within `timeout`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write a response within `timeout`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
