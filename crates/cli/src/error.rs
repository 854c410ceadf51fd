// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing error display with hints.

use std::fmt;

use slotq_daemon::protocol::{ErrorKind, ProtocolError};

use crate::client::ClientError;

/// Error with context lines and suggestions, printed on failure.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Explain a client failure against the daemon at `addr`.
    pub fn from_client(err: &ClientError, addr: &str) -> Self {
        match err {
            ClientError::DaemonNotRunning { source, .. } => {
                CliError::new(format!("Cannot reach slotqd at {}", addr))
                    .with_context(source.to_string())
                    .with_suggestion(format!("Start the daemon: slotqd --addr {}", addr))
                    .with_suggestion("Raise SLOTQ_TIMEOUT_CONNECT_MS if it is still starting")
            }
            ClientError::Rejected { kind, message } => rejected(*kind, message),
            ClientError::Protocol(ProtocolError::Timeout) => {
                CliError::new("Timed out waiting for the daemon")
                    .with_suggestion("Raise SLOTQ_TIMEOUT_IPC_MS for slow daemons")
            }
            ClientError::Protocol(ProtocolError::ConnectionClosed) => {
                CliError::new("Daemon closed the connection")
                    .with_context("The daemon may have stopped")
            }
            other => CliError::new(other.to_string()),
        }
    }
}

fn rejected(kind: ErrorKind, message: &str) -> CliError {
    let err = CliError::new(message.to_string());
    match kind {
        ErrorKind::PayloadTooLarge => err
            .with_context("Every record must fit in one slot")
            .with_suggestion("Restart slotqd with a larger --message-size on a fresh log"),
        ErrorKind::InvalidOffset => err
            .with_context("Offsets must be a multiple of the slot size")
            .with_suggestion("Check the slot size with: slotq status"),
        ErrorKind::Cancelled => err.with_context("The daemon is shutting down"),
        ErrorKind::ShortWrite | ErrorKind::ShortRead | ErrorKind::Io => {
            err.with_context("The daemon hit a storage error; see its log")
        }
        ErrorKind::BadRequest => err,
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}
