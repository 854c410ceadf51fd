// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection handling: unary requests and consume streams.

use std::sync::Arc;

use slotq_storage::{cancel_pair, CancelHandle, CancelSource, LogError, LogTailer};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::lifecycle::DaemonContext;
use crate::protocol::{
    self, ErrorKind, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION, STREAM_WRITE_TIMEOUT,
};

/// Handle a single client connection
pub async fn handle_connection(
    context: Arc<DaemonContext>,
    stream: TcpStream,
) -> Result<(), ServerError> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    // Split stream for reading/writing
    let (mut reader, mut writer) = stream.into_split();

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!(%peer, "Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!(%peer, "Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!(%peer, "Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!(%peer, "Received request: {:?}", request);

    if let Request::Consume { offset } = request {
        return stream_records(context, offset, &peer, reader, writer).await;
    }

    let response = handle_request(&context, request).await;

    debug!(%peer, "Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single unary request and return a response
async fn handle_request(context: &Arc<DaemonContext>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Publish { data } => publish(Arc::clone(context), data).await,

        Request::Status => Response::Status {
            uptime_secs: context.start_time.elapsed().as_secs(),
            slot_size: context.writer.slot_size().get(),
            next_offset: context.writer.next_offset(),
            records: context.writer.records(),
            consumers: context.consumers(),
        },

        Request::Shutdown => {
            context.shutdown.cancel();
            Response::ShuttingDown
        }

        Request::Consume { .. } => Response::Error {
            kind: ErrorKind::BadRequest,
            message: "consume is a streaming request".to_string(),
        },
    }
}

/// Append on the blocking pool: the writer takes a std mutex and does
/// synchronous file I/O, which must not stall the workers driving tails.
async fn publish(context: Arc<DaemonContext>, data: Vec<u8>) -> Response {
    match tokio::task::spawn_blocking(move || context.writer.append(&data)).await {
        Ok(Ok(appended)) => Response::Published {
            offset: appended.offset,
            next_offset: appended.next_offset,
        },
        Ok(Err(e)) => Response::error(&e),
        Err(e) => {
            error!("publish task failed: {}", e);
            Response::Error {
                kind: ErrorKind::Io,
                message: format!("publish task failed: {}", e),
            }
        }
    }
}

/// Stream records to the client until the tail ends.
///
/// The read half is handed to a watcher that fires the per-stream
/// cancellation when the client disconnects.
async fn stream_records(
    context: Arc<DaemonContext>,
    offset: u64,
    peer: &str,
    reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
) -> Result<(), ServerError> {
    let (client, client_signal) = cancel_pair();

    let opened = LogTailer::open(
        &context.config.log_path,
        context.config.slot_size,
        offset,
        context.shutdown.signal(),
        client_signal,
    )
    .await;
    let mut tailer = match opened {
        Ok(tailer) => tailer.with_poll_interval(context.config.poll_interval),
        Err(e) => {
            if e.is_caller_error() {
                debug!(peer, offset, "consume rejected: {}", e);
            } else {
                warn!(peer, offset, "failed to open tail: {}", e);
            }
            protocol::write_response(&mut writer, &Response::error(&e), DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
    };

    let watcher = tokio::spawn(watch_disconnect(reader, client));
    let _consumer = context.track_consumer();
    info!(peer, offset, "consumer attached");

    let result = loop {
        match tailer.next().await {
            Ok(record) => {
                let response = Response::Record {
                    data: record.data,
                    offset: record.offset,
                    next_offset: record.next_offset,
                };
                if let Err(e) =
                    protocol::write_response(&mut writer, &response, STREAM_WRITE_TIMEOUT).await
                {
                    warn!(peer, offset = record.offset, "stream send failed: {}", e);
                    break Err(ServerError::Protocol(e));
                }
            }
            Err(LogError::Cancelled(CancelSource::Client)) => break Ok(()),
            Err(e) => {
                // Best effort: the client may already be gone
                if let Err(send_err) =
                    protocol::write_response(&mut writer, &Response::error(&e), DEFAULT_TIMEOUT)
                        .await
                {
                    debug!(peer, "failed to send terminal frame: {}", send_err);
                }
                break Ok(());
            }
        }
    };

    watcher.abort();
    info!(peer, offset = tailer.offset(), "consumer detached");
    result
}

/// Fire `client` once the peer closes its side of the connection.
///
/// Clients send nothing after `Consume`; any further bytes are discarded.
async fn watch_disconnect(mut reader: OwnedReadHalf, client: CancelHandle) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("consumer read error: {}", e);
                break;
            }
        }
    }
    client.cancel();
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
