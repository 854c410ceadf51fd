// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the slot log

use std::fmt;
use std::io;
use thiserror::Error;

/// Which cancellation signal ended a tail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelSource {
    /// The hosting process is shutting down
    Server,
    /// The consumer went away
    Client,
}

impl fmt::Display for CancelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelSource::Server => write!(f, "server"),
            CancelSource::Client => write!(f, "client"),
        }
    }
}

/// Errors that can occur in log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("payload of {len} bytes exceeds slot size {slot_size}")]
    PayloadTooLarge { len: usize, slot_size: u32 },

    #[error("offset {offset} is not a multiple of slot size {slot_size}")]
    InvalidOffset { offset: u64, slot_size: u32 },

    #[error("only wrote {written} bytes, expected {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("only read {read} bytes at offset {offset}, expected {expected} bytes")]
    ShortRead {
        read: usize,
        expected: usize,
        offset: u64,
    },

    #[error("{0}: cancelled")]
    Cancelled(CancelSource),

    #[error("slot size must be at least 1 byte")]
    InvalidSlotSize,

    #[error("log length {len} is not a multiple of slot size {slot_size}")]
    MisalignedLog { len: u64, slot_size: u32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LogError {
    /// True when the caller supplied a bad payload or offset
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            LogError::PayloadTooLarge { .. } | LogError::InvalidOffset { .. }
        )
    }
}
