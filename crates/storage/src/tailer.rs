// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offset-based tailing reader
//!
//! A tailer owns its own read handle and walks the log one slot at a time.
//! Reaching the end of the file is the steady state, not an error: the tailer
//! sleeps for the poll interval and reads again, until one of its two
//! cancellation signals fires.

use crate::cancel::CancelSignal;
use crate::error::{CancelSource, LogError};
use crate::slot::SlotSize;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error, info, trace};

/// How long a caught-up tailer sleeps before reading again
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One slot read back from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw slot bytes, padding included
    pub data: Vec<u8>,
    /// Where the slot starts
    pub offset: u64,
    /// Where the following slot starts
    pub next_offset: u64,
}

/// Streams slots from a starting offset, following appends.
pub struct LogTailer {
    file: File,
    slot_size: SlotSize,
    offset: u64,
    buf: Vec<u8>,
    /// Bytes of the current slot already in `buf`; kept across calls so a
    /// dropped `next` future resumes mid-slot
    filled: usize,
    poll_interval: Duration,
    shutdown: CancelSignal,
    client: CancelSignal,
}

impl LogTailer {
    /// Open an independent read handle positioned at `start_offset`.
    ///
    /// `shutdown` fires when the hosting process stops; `client` fires when
    /// the consumer of this particular stream goes away.
    pub async fn open(
        path: &Path,
        slot_size: SlotSize,
        start_offset: u64,
        shutdown: CancelSignal,
        client: CancelSignal,
    ) -> Result<Self, LogError> {
        let offset = slot_size.check_offset(start_offset).inspect_err(|e| {
            error!(error = %e, "tail rejected");
        })?;

        let mut file = File::open(path).await.inspect_err(|e| {
            error!(path = %path.display(), error = %e, "failed to open log for reading");
        })?;
        file.seek(SeekFrom::Start(offset)).await?;

        debug!(path = %path.display(), offset, "tail opened");

        Ok(Self {
            file,
            slot_size,
            offset,
            buf: vec![0u8; slot_size.bytes()],
            filled: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown,
            client,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Offset of the next slot this tailer will emit
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next record in offset order, waiting for it if necessary.
    ///
    /// Never returns end-of-log. Once this returns an error the tail is over.
    /// Cancel safe: dropping the future loses no bytes of the pending slot.
    pub async fn next(&mut self) -> Result<Record, LogError> {
        match self.next_inner().await {
            Ok(record) => Ok(record),
            Err(e) => {
                match &e {
                    LogError::Cancelled(source) => {
                        info!(offset = self.offset, %source, "tail cancelled")
                    }
                    _ => error!(offset = self.offset, error = %e, "tail failed"),
                }
                Err(e)
            }
        }
    }

    async fn next_inner(&mut self) -> Result<Record, LogError> {
        loop {
            self.check_cancelled()?;

            let read = self.fill().await?;
            if read == self.buf.len() {
                let record = Record {
                    data: self.buf.clone(),
                    offset: self.offset,
                    next_offset: self.slot_size.next(self.offset),
                };
                self.offset = record.next_offset;
                self.filled = 0;
                return Ok(record);
            }

            if read > 0 {
                return Err(LogError::ShortRead {
                    read,
                    expected: self.buf.len(),
                    offset: self.offset,
                });
            }

            self.wait().await?;
        }
    }

    /// Read until the buffer is full or the file ends. Returns bytes of the
    /// current slot held so far.
    async fn fill(&mut self) -> io::Result<usize> {
        while self.filled < self.buf.len() {
            match self.file.read(&mut self.buf[self.filled..]).await {
                Ok(0) => break,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.filled)
    }

    fn check_cancelled(&self) -> Result<(), LogError> {
        if self.shutdown.is_cancelled() {
            return Err(LogError::Cancelled(CancelSource::Server));
        }
        if self.client.is_cancelled() {
            return Err(LogError::Cancelled(CancelSource::Client));
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), LogError> {
        trace!(offset = self.offset, "caught up, waiting for appends");
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(LogError::Cancelled(CancelSource::Server)),
            _ = self.client.cancelled() => Err(LogError::Cancelled(CancelSource::Client)),
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
