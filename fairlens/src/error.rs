//! Error types for fairlens.
//!
//! Every failure the library can report is a variant of [`FairlensError`].
//! None of them is fatal: callers surface [`FairlensError::user_message`] and
//! return to an idle state so the user can retry.

use thiserror::Error;

/// Maximum accepted upload size in bytes (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// The main error type for fairlens.
#[derive(Error, Debug)]
pub enum FairlensError {
    /// The input contained no non-blank lines.
    #[error("Empty CSV file")]
    EmptyInput,

    /// Neither the file extension nor the MIME type is on the allow-list.
    #[error("Unsupported file format: {mime_type}")]
    UnsupportedFormat {
        /// File name as supplied by the user
        file_name: String,
        /// MIME type as reported for the file (may be empty)
        mime_type: String,
    },

    /// The file exceeds the upload limit.
    #[error("File size exceeds 50MB limit ({size} bytes, max {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// Reading the file failed.
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A data row does not have as many cells as the header.
    #[error("Malformed row at line {line}: expected {expected} cells, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The upload endpoint rejected the dataset.
    #[error("Failed to upload dataset to backend: {message}")]
    Upload {
        /// HTTP status, when the failure came from a non-2xx response
        status: Option<u16>,
        message: String,
    },

    /// The analysis backend reported a failure or returned an incomplete result.
    #[error("{message}")]
    AnalysisFailed { message: String },

    /// Transport failure reaching the backend.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal condition.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, FairlensError>`.
pub type Result<T> = std::result::Result<T, FairlensError>;

impl FairlensError {
    /// Creates an unsupported format error.
    pub fn unsupported_format(file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates a file read error.
    pub fn file_read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an upload error from a non-2xx response.
    pub fn upload(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upload {
            status,
            message: message.into(),
        }
    }

    /// Creates an analysis failure.
    pub fn analysis_failed(message: impl Into<String>) -> Self {
        Self::AnalysisFailed {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FairlensError::Network { .. } => true,
            FairlensError::Upload {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// The message shown to the user when this error ends an operation.
    pub fn user_message(&self) -> String {
        match self {
            FairlensError::FileTooLarge { .. } => "File size exceeds 50MB limit.".to_string(),
            FairlensError::UnsupportedFormat { mime_type, .. } => {
                format!("Unsupported file format: {mime_type}")
            }
            FairlensError::EmptyInput
            | FairlensError::MalformedRow { .. }
            | FairlensError::FileRead { .. } => format!("Error processing dataset: {self}"),
            FairlensError::AnalysisFailed { message } => message.clone(),
            FairlensError::Network { message } => format!(
                "Network or API error: {message}. Check that the analysis backend is reachable."
            ),
            other => other.to_string(),
        }
    }
}

impl From<std::fmt::Error> for FairlensError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Internal(format!("Failed to format output: {err}"))
    }
}

impl From<serde_json::Error> for FairlensError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<FairlensError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            FairlensError::Internal(inner) => FairlensError::Internal(format!("{}: {inner}", f())),
            FairlensError::Serialization(inner) => {
                FairlensError::Serialization(format!("{}: {inner}", f()))
            }
            other => other,
        })
    }
}
