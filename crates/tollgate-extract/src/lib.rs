//! # Tollgate Extract
//!
//! Streaming ingestion of `multipart/form-data` uploads.
//!
//! [`stage_upload`] consumes a request body part by part. Text fields are
//! buffered into a map, the first file part is written chunk by chunk into a
//! temporary file, and the result is a [`StagedUpload`] the upload handler
//! takes ownership of. Memory use does not grow with the file size.
//!
//! [`StagedUpload`]: tollgate_core::StagedUpload

#![doc(html_root_url = "https://docs.rs/tollgate-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod upload;

pub use config::{UploadConfig, DEFAULT_MAX_FIELDS, DEFAULT_MAX_FIELD_BYTES, DEFAULT_MAX_FILE_BYTES};
pub use error::UploadError;
pub use upload::stage_upload;
