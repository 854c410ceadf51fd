// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use slotq_storage::CancelSource;

#[test]
fn publish_request_uses_type_tag() {
    let request = Request::Publish {
        data: b"hi".to_vec(),
    };

    let encoded = encode(&request).expect("encode failed");
    let json: serde_json::Value = serde_json::from_slice(&encoded).expect("valid JSON");

    assert_eq!(json["type"], "Publish");
    assert_eq!(json["data"], serde_json::json!([104, 105]));
}

#[test]
fn consume_request_decodes_from_json() {
    let request: Request = decode(br#"{"type":"Consume","offset":32}"#).expect("decode failed");
    assert_eq!(request, Request::Consume { offset: 32 });
}

#[test]
fn record_response_keeps_both_offsets() {
    let response = Response::Record {
        data: vec![1, 0, 0, 0],
        offset: 16,
        next_offset: 20,
    };

    let encoded = encode(&response).expect("encode failed");
    let decoded: Response = decode(&encoded).expect("decode failed");

    assert_eq!(response, decoded);
}

#[test]
fn error_kind_is_snake_case() {
    let response = Response::Error {
        kind: ErrorKind::PayloadTooLarge,
        message: "too big".to_string(),
    };

    let encoded = encode(&response).expect("encode failed");
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(
        json_str.contains(r#""kind":"payload_too_large""#),
        "unexpected encoding: {}",
        json_str
    );
}

#[test]
fn log_errors_map_to_kinds() {
    let cases = [
        (
            LogError::PayloadTooLarge {
                len: 20,
                slot_size: 16,
            },
            ErrorKind::PayloadTooLarge,
        ),
        (
            LogError::InvalidOffset {
                offset: 3,
                slot_size: 16,
            },
            ErrorKind::InvalidOffset,
        ),
        (
            LogError::ShortWrite {
                written: 1,
                expected: 16,
            },
            ErrorKind::ShortWrite,
        ),
        (
            LogError::ShortRead {
                read: 1,
                expected: 16,
                offset: 0,
            },
            ErrorKind::ShortRead,
        ),
        (
            LogError::Cancelled(CancelSource::Server),
            ErrorKind::Cancelled,
        ),
        (
            LogError::Io(std::io::Error::other("boom")),
            ErrorKind::Io,
        ),
    ];

    for (err, kind) in cases {
        match Response::error(&err) {
            Response::Error { kind: k, message } => {
                assert_eq!(k, kind);
                assert_eq!(message, err.to_string());
            }
            other => panic!("Expected Error response, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original)
        .await
        .expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;

    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn truncated_frame_is_connection_closed() {
    let mut buffer = 10u32.to_be_bytes().to_vec();
    buffer.extend_from_slice(b"abc");

    let mut cursor = std::io::Cursor::new(buffer);
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_length_prefix_rejected() {
    let buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();

    let mut cursor = std::io::Cursor::new(buffer);
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(ProtocolError::MessageTooLarge(_))));
}

#[tokio::test]
async fn request_response_helpers_roundtrip() {
    let mut buffer = Vec::new();
    let response = Response::Published {
        offset: 0,
        next_offset: 16,
    };
    write_response(&mut buffer, &response, DEFAULT_TIMEOUT)
        .await
        .expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let bytes = read_message(&mut cursor).await.expect("read failed");
    let decoded: Response = decode(&bytes).expect("decode failed");
    assert_eq!(decoded, response);

    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&Request::Status).expect("encode failed"))
        .await
        .expect("write failed");
    let mut cursor = std::io::Cursor::new(buffer);
    let request = read_request(&mut cursor, DEFAULT_TIMEOUT)
        .await
        .expect("read failed");
    assert_eq!(request, Request::Status);
}
