//! `multipart/form-data` decoding.
//!
//! Bodies are parsed once per request into [`Part`]s. Text fields are merged into
//! the request parameters; file parts become [`UploadedFile`]s for the
//! `MULTIPART_FILE` and `MULTIPART_FILE_LIST` extractors. Per-file, total and
//! field-count limits are enforced while parsing.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::TempPath;
use thiserror::Error;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum total upload size (50MB).
pub const DEFAULT_MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum number of parts.
pub const DEFAULT_MAX_FIELDS: usize = 100;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartConfig {
    pub max_file_size: usize,
    pub max_total_size: usize,
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    #[error("missing boundary in multipart Content-Type")]
    MissingBoundary,
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    #[error("file too large: {size} bytes exceeds limit of {max}")]
    FileTooLarge { size: usize, max: usize },
    #[error("total upload too large: {size} bytes exceeds limit of {max}")]
    TotalTooLarge { size: usize, max: usize },
    #[error("too many parts: {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
    #[error("missing Content-Disposition header in part")]
    MissingContentDisposition,
    #[error("invalid Content-Disposition: {0}")]
    InvalidContentDisposition(&'static str),
    #[error("invalid part headers: {0}")]
    InvalidPartHeaders(&'static str),
    #[error("unexpected end of multipart data")]
    UnexpectedEof,
    #[error("invalid multipart format: {0}")]
    InvalidFormat(&'static str),
}

/// One decoded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl Part {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// UTF-8 content of a text field.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// True if the Content-Type header denotes a multipart form.
#[must_use]
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..19)
        .is_some_and(|p| p.eq_ignore_ascii_case("multipart/form-data"))
}

/// Extract the boundary from a `multipart/form-data; boundary=...` header value.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    if !is_multipart(content_type) {
        return Err(MultipartError::InvalidBoundary);
    }
    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = unquote(value);
            if boundary.is_empty() {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(boundary.to_string());
        }
    }
    Err(MultipartError::MissingBoundary)
}

/// Boundary-delimited body parser.
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: Vec<u8>,
    config: MultipartConfig,
}

impl MultipartParser {
    #[must_use]
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            config,
        }
    }

    /// Parse every part of `body`. The preamble before the first delimiter and
    /// the epilogue after the closing delimiter are ignored.
    pub fn parse(&self, body: &[u8]) -> Result<Vec<Part>, MultipartError> {
        let mut parts = Vec::new();
        let mut total = 0usize;
        let mut pos = self.find_delimiter(body, 0)?;

        loop {
            let after = pos + self.delimiter.len();
            if body.get(after..after + 2) == Some(&b"--"[..]) {
                return Ok(parts);
            }
            if parts.len() >= self.config.max_fields {
                return Err(MultipartError::TooManyFields {
                    count: parts.len() + 1,
                    max: self.config.max_fields,
                });
            }
            match body.get(after..after + 2) {
                Some(b"\r\n") => {}
                Some(_) => return Err(MultipartError::InvalidFormat("expected CRLF after boundary")),
                None => return Err(MultipartError::UnexpectedEof),
            }

            let (headers, data_start) = parse_part_headers(body, after + 2)?;
            let disposition = headers
                .get("content-disposition")
                .ok_or(MultipartError::MissingContentDisposition)?;
            let (name, filename) = parse_content_disposition(disposition)?;

            let next = self.find_delimiter(body, data_start)?;
            let data_end = if next >= data_start + 2 && &body[next - 2..next] == b"\r\n" {
                next - 2
            } else {
                next
            };
            let data = &body[data_start..data_end];

            if filename.is_some() && data.len() > self.config.max_file_size {
                return Err(MultipartError::FileTooLarge {
                    size: data.len(),
                    max: self.config.max_file_size,
                });
            }
            total += data.len();
            if total > self.config.max_total_size {
                return Err(MultipartError::TotalTooLarge {
                    size: total,
                    max: self.config.max_total_size,
                });
            }

            parts.push(Part {
                name,
                filename,
                content_type: headers.get("content-type").cloned(),
                data: data.to_vec(),
                headers,
            });
            pos = next;
        }
    }

    fn find_delimiter(&self, data: &[u8], start: usize) -> Result<usize, MultipartError> {
        data.get(start..)
            .and_then(|tail| {
                tail.windows(self.delimiter.len())
                    .position(|w| w == self.delimiter.as_slice())
            })
            .map(|offset| start + offset)
            .ok_or(MultipartError::UnexpectedEof)
    }
}

fn parse_part_headers(
    data: &[u8],
    start: usize,
) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;
    loop {
        let line_end = find_crlf(data, pos)?;
        let line = &data[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }
        let line = std::str::from_utf8(line)
            .map_err(|_| MultipartError::InvalidPartHeaders("invalid UTF-8 in header"))?;
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        pos = line_end + 2;
    }
}

fn find_crlf(data: &[u8], start: usize) -> Result<usize, MultipartError> {
    data.get(start..)
        .and_then(|tail| tail.windows(2).position(|w| w == b"\r\n"))
        .map(|offset| start + offset)
        .ok_or(MultipartError::UnexpectedEof)
}

/// `form-data; name="field"; filename="file.txt"`
fn parse_content_disposition(value: &str) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';').skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw).to_string());
        } else if key.eq_ignore_ascii_case("filename") {
            let unquoted = unquote(raw);
            if unquoted.contains("..")
                || unquoted.contains('/')
                || unquoted.contains('\\')
                || unquoted.contains('\0')
            {
                return Err(MultipartError::InvalidContentDisposition(
                    "filename contains path traversal characters",
                ));
            }
            filename = Some(unquoted.to_string());
        }
    }

    let name = name.ok_or(MultipartError::InvalidContentDisposition(
        "missing name parameter",
    ))?;
    Ok((name, filename))
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// A file received in a multipart form.
///
/// Contents are held in memory and shared between clones. A temporary file is
/// only written when [`path`](Self::path) is first called; it is removed when
/// the last clone is dropped.
#[derive(Clone)]
pub struct UploadedFile {
    field_name: String,
    filename: String,
    content_type: String,
    data: Arc<[u8]>,
    temp: Arc<Mutex<Option<TempPath>>>,
}

impl UploadedFile {
    /// Build from a file part. Returns `None` for text fields.
    #[must_use]
    pub fn from_part(part: &Part) -> Option<Self> {
        let filename = part.filename.clone()?;
        Some(Self::new(
            part.name.clone(),
            filename,
            part.content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            part.data.clone(),
        ))
    }

    pub fn new(
        field_name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
            temp: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Original filename as sent by the client.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// A reader over the file contents.
    #[must_use]
    pub fn stream(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes())
    }

    /// Extension of the original filename, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Path of a temporary file holding the contents, written on first use.
    pub fn path(&self) -> io::Result<PathBuf> {
        let mut slot = self.temp.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.to_path_buf());
        }
        let mut file = tempfile::Builder::new().prefix("waypoint-upload-").tempfile()?;
        file.write_all(&self.data)?;
        file.flush()?;
        let temp = file.into_temp_path();
        let path = temp.to_path_buf();
        *slot = Some(temp);
        Ok(path)
    }

    /// Write the contents to `dest`, replacing any existing file.
    pub fn transfer_to(&self, dest: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(dest, &self.data)
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field_name", &self.field_name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl PartialEq for UploadedFile {
    fn eq(&self, other: &Self) -> bool {
        self.field_name == other.field_name
            && self.filename == other.filename
            && self.content_type == other.content_type
            && self.data == other.data
    }
}
