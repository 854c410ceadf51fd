// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot layout and offset arithmetic
//!
//! The log is a raw concatenation of equal-size slots. Slot `n` starts at
//! byte `n * S`; every offset handed out or accepted is a multiple of `S`.

use crate::error::LogError;
use std::fmt;

/// Fixed byte length of every slot in a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotSize(u32);

impl SlotSize {
    pub fn new(bytes: u32) -> Result<Self, LogError> {
        if bytes == 0 {
            return Err(LogError::InvalidSlotSize);
        }
        Ok(Self(bytes))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn bytes(self) -> usize {
        self.0 as usize
    }

    pub fn as_u64(self) -> u64 {
        u64::from(self.0)
    }

    /// Reject offsets that do not fall on a slot boundary
    pub fn check_offset(self, offset: u64) -> Result<u64, LogError> {
        if offset % self.as_u64() != 0 {
            return Err(LogError::InvalidOffset {
                offset,
                slot_size: self.0,
            });
        }
        Ok(offset)
    }

    /// Reject payloads that do not fit in one slot
    pub fn check_payload(self, len: usize) -> Result<(), LogError> {
        if len > self.bytes() {
            return Err(LogError::PayloadTooLarge {
                len,
                slot_size: self.0,
            });
        }
        Ok(())
    }

    /// Reject an existing log whose length is not a whole number of slots
    pub fn check_log_len(self, len: u64) -> Result<u64, LogError> {
        if len % self.as_u64() != 0 {
            return Err(LogError::MisalignedLog {
                len,
                slot_size: self.0,
            });
        }
        Ok(len)
    }

    /// Offset of the slot following the one at `offset`
    pub fn next(self, offset: u64) -> u64 {
        offset + self.as_u64()
    }

    /// Number of whole slots below `offset`
    pub fn count(self, offset: u64) -> u64 {
        offset / self.as_u64()
    }

    /// Build the on-disk slot for `payload`: left-aligned, zero-padded.
    pub fn pad(self, payload: &[u8]) -> Result<Vec<u8>, LogError> {
        self.check_payload(payload.len())?;
        let mut slot = vec![0u8; self.bytes()];
        slot[..payload.len()].copy_from_slice(payload);
        Ok(slot)
    }
}

impl fmt::Display for SlotSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload prefix of a slot, up to the first zero byte.
///
/// Slots carry no length prefix, so this is only a display helper: a payload
/// that itself contains zero bytes is cut short.
pub fn trim_padding(slot: &[u8]) -> &[u8] {
    match slot.iter().position(|b| *b == 0) {
        Some(end) => &slot[..end],
        None => slot,
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
