//! Error types for the uploader.

use thiserror::Error;

use crate::utils::file_size::FileSizeUtils;

/// Crate-level error for configuration, I/O, HTTP and catalog failures.
#[derive(Error, Debug)]
pub enum UploaderError {
    /// Configuration could not be read or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error outside of a bulk submission.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The file type catalog could not be fetched or is inconsistent.
    #[error("file type catalog error: {0}")]
    Catalog(String),
}

impl From<reqwest::Error> for UploaderError {
    fn from(e: reqwest::Error) -> Self {
        UploaderError::Http(e.to_string())
    }
}

/// Result alias using [`UploaderError`].
pub type Result<T> = std::result::Result<T, UploaderError>;

fn limit_mb(bytes: &u64) -> String {
    FileSizeUtils::megabytes(*bytes)
}

/// Problems detected locally, either while staging files or before a
/// submission is attempted. None of them involve the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file {name} exceeds the maximum size of {} MB", limit_mb(.limit_bytes))]
    SizeExceeded {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("file type {mime_type} is not allowed ({name})")]
    UnsupportedType { name: String, mime_type: String },

    /// `dropped` is set when staging discarded files, and absent when an
    /// oversized batch is caught before submitting.
    #[error("{}", too_many_files(.max_files, .dropped))]
    TooManyFiles {
        max_files: usize,
        dropped: Option<usize>,
    },

    #[error("at least one file must be selected")]
    NoFilesSelected,

    #[error("{count} file(s) have no file type assigned")]
    MissingTypeAssignment { count: usize },

    #[error("missing required files: {}", .names.join(", "))]
    MissingRequiredTypes { names: Vec<String> },

    #[error("file type {type_id} is not available")]
    UnknownFileType { type_id: i64 },
}

/// Failure of a bulk submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("{}", join_messages(.0))]
    ValidationFailed(Vec<ValidationError>),

    #[error("no authentication token found")]
    Unauthenticated,

    #[error("network error while uploading files: {0}")]
    NetworkError(String),

    #[error("failed to read {name}: {reason}")]
    FileUnreadable { name: String, reason: String },

    #[error("server rejected the upload ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("a submission is already in progress")]
    AlreadyInFlight,

    #[error("the uploader has been closed")]
    SessionClosed,
}

impl SubmissionError {
    /// Individual user-facing messages. Validation failures expand to one
    /// message per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SubmissionError::ValidationFailed(errors) => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

fn too_many_files(max_files: &usize, dropped: &Option<usize>) -> String {
    match dropped {
        Some(dropped) => format!(
            "at most {} files are allowed; {} file(s) were not added",
            max_files, dropped
        ),
        None => format!("at most {} files can be submitted at once", max_files),
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure reported by a [`crate::upload::BulkTransport`] before any HTTP
/// status is available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),

    #[error("failed to read {name}: {reason}")]
    FileRead { name: String, reason: String },
}

impl From<TransportError> for SubmissionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Network(msg) => SubmissionError::NetworkError(msg),
            TransportError::FileRead { name, reason } => {
                SubmissionError::FileUnreadable { name, reason }
            }
        }
    }
}
