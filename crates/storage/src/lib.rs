// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! slotq-storage: fixed-slot append-only log
//!
//! - [`LogWriter`] appends zero-padded slots, one writer at a time
//! - [`LogTailer`] streams slots from an offset and follows new appends
//! - [`SlotSize`] holds the offset arithmetic both sides agree on

pub mod cancel;
pub mod error;
pub mod slot;
pub mod tailer;
pub mod writer;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use error::{CancelSource, LogError};
pub use slot::{trim_padding, SlotSize};
pub use tailer::{LogTailer, Record, DEFAULT_POLL_INTERVAL};
pub use writer::{Appended, LogFile, LogWriter};
