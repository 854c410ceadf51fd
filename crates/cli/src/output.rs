// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;
use slotq_storage::trim_padding;

use crate::client::StreamedRecord;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(value) {
                println!("{}", json);
            }
        }
    }
}

/// One consumed record as printed
#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    offset: u64,
    next_offset: u64,
    data: &'a str,
}

/// Render a consumed record, or `None` for a slot holding an empty payload.
pub fn format_record(record: &StreamedRecord, format: OutputFormat) -> Option<String> {
    let payload = trim_padding(&record.data);
    if payload.is_empty() {
        return None;
    }
    let data = String::from_utf8_lossy(payload);
    match format {
        OutputFormat::Text => Some(format!("offset: {:>10}, data: {:?}", record.offset, data)),
        OutputFormat::Json => serde_json::to_string(&RecordLine {
            offset: record.offset,
            next_offset: record.next_offset,
            data: &data,
        })
        .ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(data: &[u8], offset: u64) -> StreamedRecord {
        let mut data = data.to_vec();
        data.resize(16, 0);
        StreamedRecord {
            data,
            offset,
            next_offset: offset + 16,
        }
    }

    #[test]
    fn text_line_pads_offset_and_strips_padding() {
        let line = format_record(&record(b"hello", 16), OutputFormat::Text);
        assert_eq!(line.as_deref(), Some("offset:         16, data: \"hello\""));
    }

    #[test]
    fn json_line_carries_offset_and_data() {
        let line = format_record(&record(b"world!", 32), OutputFormat::Json);
        assert_eq!(
            line.as_deref(),
            Some(r#"{"offset":32,"next_offset":48,"data":"world!"}"#)
        );
    }

    #[test]
    fn empty_payload_prints_nothing() {
        assert_eq!(format_record(&record(b"", 0), OutputFormat::Text), None);
    }
}
