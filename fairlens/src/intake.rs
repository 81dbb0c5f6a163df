//! Upload intake: format and size checks before anything is parsed or sent.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::{FairlensError, Result, MAX_UPLOAD_BYTES};

/// File extensions accepted regardless of MIME type.
pub const ALLOWED_EXTENSIONS: [&str; 5] = [".xlsx", ".xls", ".csv", ".tsv", ".txt"];

/// MIME types accepted regardless of extension.
///
/// Includes the empty string and `application/octet-stream`, which browsers
/// report for files they cannot classify.
pub const ALLOWED_MIME_TYPES: [&str; 12] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/excel",
    "application/x-excel",
    "application/x-msexcel",
    "text/csv",
    "text/plain",
    "text/tab-separated-values",
    "application/csv",
    "application/x-csv",
    "",
    "application/octet-stream",
];

/// Metadata of a file the user wants to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl UploadCandidate {
    /// Creates a candidate, guessing the MIME type from the name.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let mime_type = guess_mime(&name).to_string();
        Self {
            name,
            mime_type,
            size,
        }
    }

    /// Overrides the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Checks the size limit, then the format allow-lists.
    ///
    /// # Errors
    ///
    /// [`FairlensError::FileTooLarge`] above 50 MiB (exactly 50 MiB passes),
    /// otherwise [`FairlensError::UnsupportedFormat`] when neither the
    /// extension nor the MIME type is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.size > MAX_UPLOAD_BYTES {
            return Err(FairlensError::FileTooLarge {
                size: self.size,
                max: MAX_UPLOAD_BYTES,
            });
        }
        if has_allowed_extension(&self.name) || ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str())
        {
            Ok(())
        } else {
            Err(FairlensError::unsupported_format(&self.name, &self.mime_type))
        }
    }
}

/// A validated file and its decoded text.
#[derive(Debug, Clone)]
pub struct DatasetUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// `bytes` decoded as UTF-8 without a leading byte-order mark, invalid
    /// sequences replaced
    pub text: String,
}

impl DatasetUpload {
    /// Validates `candidate` and wraps bytes already in memory.
    ///
    /// The size limit is checked against `bytes`, not the size recorded in
    /// the candidate.
    ///
    /// # Errors
    ///
    /// Same as [`UploadCandidate::validate`].
    pub fn from_bytes(mut candidate: UploadCandidate, bytes: Vec<u8>) -> Result<Self> {
        candidate.size = bytes.len() as u64;
        candidate.validate()?;
        let text = decode_text(&bytes);
        Ok(Self {
            file_name: candidate.name,
            mime_type: candidate.mime_type,
            bytes,
            text,
        })
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Stats, validates and reads the file at `path`.
///
/// The size is checked from metadata before the contents are read, and again
/// on the bytes actually read.
///
/// # Errors
///
/// [`FairlensError::FileRead`] for IO failures, plus the errors of
/// [`UploadCandidate::validate`].
#[instrument]
pub async fn read_upload(path: &Path) -> Result<DatasetUpload> {
    let display = path.display().to_string();
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FairlensError::file_read(&display, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| display.clone());
    let candidate = UploadCandidate::new(name, metadata.len());
    candidate.validate()?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FairlensError::file_read(&display, e))?;
    debug!(file = %candidate.name, bytes = bytes.len(), "Read upload");

    DatasetUpload::from_bytes(candidate, bytes)
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}

/// MIME type sent with the multipart upload for a file name.
pub fn guess_mime(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("csv") => "text/csv",
        Some("tsv") => "text/tab-separated-values",
        Some("txt") => "text/plain",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn has_allowed_extension(name: &str) -> bool {
    let lowered = name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}
