//! Staging uploads from chunked multipart bodies.

use bytes::Bytes;
use futures_util::stream;
use http::{header, HeaderMap};
use http_body::Frame;
use http_body_util::StreamBody;
use parking_lot::Mutex;
use std::convert::Infallible;
use tollgate_core::{CorrelationId, LogLevel, LoggerHandle};
use tollgate_extract::{stage_upload, UploadConfig, UploadError};

const BOUNDARY: &str = "tollgate-test-boundary";

#[derive(Default)]
struct Recording(Mutex<Vec<(String, LogLevel)>>);

impl LoggerHandle for Recording {
    fn log(&self, _correlation_id: &str, message: &str, level: LogLevel) {
        self.0.lock().push((message.to_string(), level));
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn encode(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
            Part::File(name, filename, data) => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(data);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn chunked(
    bytes: Vec<u8>,
    chunk_size: usize,
) -> StreamBody<impl futures_util::Stream<Item = Result<Frame<Bytes>, Infallible>> + Send + 'static>
{
    let chunks: Vec<Result<Frame<Bytes>, Infallible>> = bytes
        .chunks(chunk_size)
        .map(|c| Ok(Frame::data(Bytes::copy_from_slice(c))))
        .collect();
    StreamBody::new(stream::iter(chunks))
}

fn multipart_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}")
            .parse()
            .unwrap(),
    );
    headers
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn staged_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_multi_megabyte_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = UploadConfig::new().dir(dir.path().join("uploads"));
    let data = payload(3 * 1024 * 1024 + 17);
    let body = encode(&[
        Part::Text("gameId", "kud-42"),
        Part::File("file", "scores.bin", &data),
        Part::Text("season", "2024"),
    ]);

    let logger = Recording::default();
    let upload = stage_upload(
        &multipart_headers(),
        chunked(body, 64 * 1024),
        &config,
        &CorrelationId::new("cid-up"),
        &logger,
    )
    .await
    .unwrap();

    assert_eq!(upload.original_filename(), "scores.bin");
    assert_eq!(upload.field_name(), "file");
    assert_eq!(upload.field("gameId"), Some("kud-42"));
    assert_eq!(upload.field("season"), Some("2024"));
    assert_eq!(upload.size_bytes(), data.len() as u64);
    assert!(upload.chunk_count() > 1);
    assert_eq!(std::fs::read(upload.temporary_path()).unwrap(), data);

    let path = upload.temporary_path().to_path_buf();
    drop(upload);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_zero_byte_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = UploadConfig::new().dir(dir.path());
    let body = encode(&[Part::File("file", "empty.txt", b"")]);

    let upload = stage_upload(
        &multipart_headers(),
        chunked(body, 7),
        &config,
        &CorrelationId::new("cid-empty"),
        &Recording::default(),
    )
    .await
    .unwrap();

    assert_eq!(upload.size_bytes(), 0);
    assert!(std::fs::read(upload.temporary_path()).unwrap().is_empty());
}

#[tokio::test]
async fn test_second_file_is_drained_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let config = UploadConfig::new().dir(dir.path());
    let body = encode(&[
        Part::File("file", "first.csv", b"a,b\n1,2\n"),
        Part::File("other", "second.csv", b"ignored"),
    ]);

    let logger = Recording::default();
    let upload = stage_upload(
        &multipart_headers(),
        chunked(body, 16),
        &config,
        &CorrelationId::new("cid-two"),
        &logger,
    )
    .await
    .unwrap();

    assert_eq!(upload.original_filename(), "first.csv");
    assert_eq!(std::fs::read(upload.temporary_path()).unwrap(), b"a,b\n1,2\n");
    assert_eq!(staged_files(dir.path()), 1);

    let entries = logger.0.lock();
    assert!(entries
        .iter()
        .any(|(msg, level)| msg.contains("second.csv") && *level == LogLevel::Warn));
}

#[tokio::test]
async fn test_no_file_part() {
    let dir = tempfile::tempdir().unwrap();
    let body = encode(&[Part::Text("gameId", "kud-42")]);

    let err = stage_upload(
        &multipart_headers(),
        chunked(body, 32),
        &UploadConfig::new().dir(dir.path()),
        &CorrelationId::new("cid-none"),
        &Recording::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::NoFile));
}

#[tokio::test]
async fn test_oversized_file_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let config = UploadConfig::new().dir(dir.path()).max_file_bytes(1024);
    let body = encode(&[Part::File("file", "big.bin", &payload(4096))]);

    let err = stage_upload(
        &multipart_headers(),
        chunked(body, 512),
        &config,
        &CorrelationId::new("cid-big"),
        &Recording::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::FileTooLarge { limit: 1024 }));
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_field_limits() {
    let dir = tempfile::tempdir().unwrap();

    let too_many = encode(&[
        Part::Text("a", "1"),
        Part::Text("b", "2"),
        Part::File("file", "f.txt", b"x"),
    ]);
    let err = stage_upload(
        &multipart_headers(),
        chunked(too_many, 64),
        &UploadConfig::new().dir(dir.path()).max_fields(2),
        &CorrelationId::new("cid-fields"),
        &Recording::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, UploadError::TooManyFields { limit: 2 }));

    let long_value = "v".repeat(100);
    let too_long = encode(&[Part::Text("note", &long_value), Part::File("file", "f.txt", b"x")]);
    let err = stage_upload(
        &multipart_headers(),
        chunked(too_long, 64),
        &UploadConfig::new().dir(dir.path()).max_field_bytes(10),
        &CorrelationId::new("cid-field"),
        &Recording::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, UploadError::FieldTooLarge { ref name, .. } if name == "note"));
}

#[tokio::test]
async fn test_truncated_body_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = encode(&[Part::File("file", "cut.bin", &payload(2048))]);
    body.truncate(body.len() / 2);

    let err = stage_upload(
        &multipart_headers(),
        chunked(body, 256),
        &UploadConfig::new().dir(dir.path()),
        &CorrelationId::new("cid-cut"),
        &Recording::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::Malformed(_)));
    assert_eq!(staged_files(dir.path()), 0);
}
