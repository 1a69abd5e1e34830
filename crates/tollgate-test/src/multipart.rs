//! `multipart/form-data` bodies delivered in chunks.

use bytes::Bytes;

const DEFAULT_BOUNDARY: &str = "tollgate-test-boundary-7f3a";
const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

/// Builds a multipart body and splits it into fixed-size chunks, the way a
/// client streaming a large upload would deliver it.
///
/// ```rust
/// use tollgate_test::MultipartBody;
///
/// let body = MultipartBody::new()
///     .text("gameId", "kud-42")
///     .file("file", "scores.csv", "text/csv", "a,b\n1,2\n")
///     .chunk_size(8);
/// assert!(body.chunks().len() > 1);
/// ```
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
    chunk_size: usize,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// An empty body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY.to_string(),
            parts: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Adds a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a file part.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Sets the delivery chunk size. Zero is treated as one.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// The `content-type` header announcing this body.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// The encoded body.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            match part {
                Part::Text { name, value } => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Bytes::from(out)
    }

    /// The encoded body split into delivery chunks.
    #[must_use]
    pub fn chunks(&self) -> Vec<Bytes> {
        let encoded = self.to_bytes();
        (0..encoded.len())
            .step_by(self.chunk_size)
            .map(|start| encoded.slice(start..(start + self.chunk_size).min(encoded.len())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_reassemble() {
        let body = MultipartBody::new()
            .text("season", "2024")
            .file("file", "a.bin", "application/octet-stream", vec![7u8; 1000])
            .chunk_size(100);

        let chunks = body.chunks();
        assert!(chunks.iter().all(|c| c.len() <= 100));
        assert_eq!(chunks.concat(), body.to_bytes().to_vec());
        assert!(body.content_type().starts_with("multipart/form-data; boundary="));
    }
}
