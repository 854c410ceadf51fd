// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer append path for the slot log

use crate::error::LogError;
use crate::slot::SlotSize;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info};

/// File operations the writer needs beyond `Write + Seek`
pub trait LogFile: Write + Seek + Send {
    /// Cut the file to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Flush buffered data and fsync
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

/// Result of a successful append.
///
/// `offset` is where the record starts, the same value a tailer reports as the
/// record's `offset`. `next_offset` is where the log now ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub offset: u64,
    pub next_offset: u64,
}

struct Tail<F> {
    file: F,
    next_offset: u64,
}

/// Appends fixed-size slots to the end of a log file.
///
/// Concurrent callers are serialized; one slot is written at a time.
pub struct LogWriter<F: LogFile = File> {
    slot_size: SlotSize,
    tail: Mutex<Tail<F>>,
}

impl LogWriter<File> {
    /// Open or create the log at `path`.
    ///
    /// The existing length becomes the next write offset. The file is not
    /// opened in append mode so a failed write can be rolled back by position.
    pub fn open(path: &Path, slot_size: SlotSize) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let writer = Self::from_file(file, slot_size)?;
        info!(
            path = %path.display(),
            slot_size = slot_size.get(),
            next_offset = writer.next_offset(),
            "opened log"
        );
        Ok(writer)
    }
}

impl<F: LogFile> LogWriter<F> {
    /// Wrap an already-open file, positioning at its end
    pub fn from_file(mut file: F, slot_size: SlotSize) -> Result<Self, LogError> {
        let len = file.seek(SeekFrom::End(0))?;
        let next_offset = slot_size.check_log_len(len)?;

        Ok(Self {
            slot_size,
            tail: Mutex::new(Tail { file, next_offset }),
        })
    }

    /// Append one record as a zero-padded slot
    pub fn append(&self, payload: &[u8]) -> Result<Appended, LogError> {
        let slot = match self.slot_size.pad(payload) {
            Ok(slot) => slot,
            Err(e) => {
                error!(error = %e, "append rejected");
                return Err(e);
            }
        };

        // Counter only moves after a full slot write, so a poisoned guard
        // still holds a consistent offset.
        let mut tail = self.tail.lock().unwrap_or_else(|e| e.into_inner());
        let offset = tail.next_offset;

        // Position from the counter, not from wherever the handle was left
        if let Err(e) = tail.file.seek(SeekFrom::Start(offset)) {
            error!(offset, error = %e, "seek to log end failed");
            return Err(e.into());
        }

        // One write for payload and padding: readers never see a payload
        // without its padding.
        let written = match tail.file.write(&slot) {
            Ok(n) => n,
            Err(e) => {
                error!(offset, error = %e, "slot write failed, rolling back");
                // The write may have stored a prefix before failing
                let _ = Self::rollback(&mut tail.file, offset);
                return Err(e.into());
            }
        };

        if written < slot.len() {
            error!(
                offset,
                written,
                expected = slot.len(),
                "short write, rolling back"
            );
            Self::rollback(&mut tail.file, offset)?;
            return Err(LogError::ShortWrite {
                written,
                expected: slot.len(),
            });
        }

        tail.next_offset = self.slot_size.next(offset);
        debug!(
            offset,
            next_offset = tail.next_offset,
            len = payload.len(),
            "appended"
        );

        Ok(Appended {
            offset,
            next_offset: tail.next_offset,
        })
    }

    /// Cut the file back to `offset` and seek there. The seek runs even when
    /// the truncate fails; the next append overwrites from `offset` anyway.
    fn rollback(file: &mut F, offset: u64) -> Result<(), LogError> {
        let truncated = file.truncate(offset);
        let sought = file.seek(SeekFrom::Start(offset)).map(|_| ());
        match truncated.and(sought) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(offset, error = %e, "rollback failed, log may hold a torn slot");
                Err(e.into())
            }
        }
    }

    /// Offset the next append will be written at
    pub fn next_offset(&self) -> u64 {
        self.tail.lock().unwrap_or_else(|e| e.into_inner()).next_offset
    }

    pub fn slot_size(&self) -> SlotSize {
        self.slot_size
    }

    /// Number of records in the log
    pub fn records(&self) -> u64 {
        self.slot_size.count(self.next_offset())
    }

    /// Flush and fsync. Appends themselves never sync.
    pub fn sync(&self) -> Result<(), LogError> {
        let mut tail = self.tail.lock().unwrap_or_else(|e| e.into_inner());
        tail.file.sync()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
