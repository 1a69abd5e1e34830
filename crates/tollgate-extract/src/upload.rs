//! Multipart staging.

use crate::config::UploadConfig;
use crate::error::UploadError;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt, TryStreamExt};
use http::{header, HeaderMap};
use http_body::Body;
use http_body_util::BodyStream;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::task::Poll;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tollgate_core::{CorrelationId, LogLevel, LoggerHandle, StagedUpload};

struct StagedFile {
    path: TempPath,
    field_name: String,
    filename: String,
    content_type: Option<String>,
    size_bytes: u64,
    chunk_count: usize,
}

/// Streams a multipart body into a [`StagedUpload`].
///
/// The first file part is written to a fresh temporary file under
/// `config.dir`, one write per received chunk. Later file parts are drained
/// and logged. Text fields are collected into the upload's field map. The
/// function returns only once the whole body has been consumed.
///
/// On any failure the partially written file is removed.
pub async fn stage_upload<B>(
    headers: &HeaderMap,
    body: B,
    config: &UploadConfig,
    correlation_id: &CorrelationId,
    logger: &dyn LoggerHandle,
) -> Result<StagedUpload, UploadError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>> + 'static,
{
    let boundary = multipart_boundary(headers)?;
    let stream =
        BodyStream::new(body).try_filter_map(|frame| async move { Ok(frame.into_data().ok()) });
    let mut multipart = multer::Multipart::new(paced(stream), boundary);

    let mut fields = HashMap::new();
    let mut staged: Option<StagedFile> = None;
    let mut part_count = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        part_count += 1;
        if part_count > config.max_fields {
            return Err(UploadError::TooManyFields {
                limit: config.max_fields,
            });
        }

        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(ToString::to_string);

        match filename {
            Some(filename) if staged.is_none() => {
                let content_type = field.content_type().map(ToString::to_string);
                let path = tempfile_in(config).await?;
                let mut file = tokio::fs::OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .open(&path)
                    .await?;

                let mut size_bytes = 0u64;
                let mut chunk_count = 0usize;
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    size_bytes += chunk.len() as u64;
                    if size_bytes > config.max_file_bytes {
                        return Err(UploadError::FileTooLarge {
                            limit: config.max_file_bytes,
                        });
                    }
                    file.write_all(&chunk).await?;
                    chunk_count += 1;
                }
                file.flush().await?;

                tracing::debug!(
                    correlation_id = %correlation_id,
                    filename = %filename,
                    size_bytes,
                    chunk_count,
                    "file part staged"
                );
                staged = Some(StagedFile {
                    path,
                    field_name: name,
                    filename,
                    content_type,
                    size_bytes,
                    chunk_count,
                });
            }
            Some(filename) => {
                let mut drained = 0u64;
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    drained += chunk.len() as u64;
                }
                logger.log(
                    correlation_id.as_str(),
                    &format!("Ignoring additional file part '{filename}' ({drained} bytes)"),
                    LogLevel::Warn,
                );
            }
            None => {
                let mut value = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    if value.len() + chunk.len() > config.max_field_bytes {
                        return Err(UploadError::FieldTooLarge {
                            name,
                            limit: config.max_field_bytes,
                        });
                    }
                    value.extend_from_slice(&chunk);
                }
                fields.insert(name, String::from_utf8_lossy(&value).into_owned());
            }
        }
    }

    let staged = staged.ok_or(UploadError::NoFile)?;
    logger.log(
        correlation_id.as_str(),
        &format!(
            "Received file '{}' ({} bytes in {} chunks)",
            staged.filename, staged.size_bytes, staged.chunk_count
        ),
        LogLevel::Info,
    );

    Ok(StagedUpload::new(staged.path, staged.filename)
        .with_field_name(staged.field_name)
        .with_content_type(staged.content_type)
        .with_extra_fields(fields)
        .with_stats(staged.size_bytes, staged.chunk_count))
}

/// Hands multer one body chunk per poll.
///
/// multer drains its source until it sees `Pending`, so an eager body would
/// otherwise be buffered whole before the first field chunk comes out.
fn paced<S>(source: S) -> impl Stream<Item = S::Item> + Send + 'static
where
    S: Stream + Send + 'static,
    S::Item: 'static,
{
    let mut source: BoxStream<'static, S::Item> = source.boxed();
    let mut yielded = false;
    stream::poll_fn(move |cx| {
        if std::mem::take(&mut yielded) {
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        let next = source.poll_next_unpin(cx);
        yielded = matches!(next, Poll::Ready(Some(_)));
        next
    })
}

fn multipart_boundary(headers: &HeaderMap) -> Result<String, UploadError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| UploadError::NotMultipart("missing content-type".to_string()))?
        .to_str()
        .map_err(|_| UploadError::NotMultipart("content-type is not valid UTF-8".to_string()))?;

    let mime: mime::Mime = content_type
        .parse()
        .map_err(|_| UploadError::NotMultipart(format!("unparseable content-type '{content_type}'")))?;
    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(UploadError::NotMultipart(format!(
            "got '{}'",
            mime.essence_str()
        )));
    }

    multer::parse_boundary(content_type)
        .map_err(|_| UploadError::NotMultipart("missing multipart boundary".to_string()))
}

async fn tempfile_in(config: &UploadConfig) -> Result<TempPath, UploadError> {
    tokio::fs::create_dir_all(&config.dir).await?;
    let dir = config.dir.clone();
    let path = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .map(tempfile::NamedTempFile::into_temp_path)
    })
    .await
    .map_err(std::io::Error::other)??;
    Ok(path)
}

fn malformed(err: multer::Error) -> UploadError {
    UploadError::Malformed(err.to_string())
}
