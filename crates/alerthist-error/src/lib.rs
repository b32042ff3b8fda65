use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for alert history operations.
///
/// Every variant is fatal for the operation that produced it. Nothing in the
/// history crates retries or skips; the caller decides whether the process
/// keeps running.
#[derive(Error, Debug)]
pub enum HistoryError {
    // === I/O Errors ===
    /// Untyped I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An existing history file could not be opened or read.
    #[error("unable to read from the file '{path}': {source}")]
    CannotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The history file could not be created, written or synced.
    #[error("unable to write on '{path}': {source}")]
    CannotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// The history path exists but is a directory, socket, device, ...
    #[error("'{path}' is not a regular file")]
    NotARegularFile { path: PathBuf },

    /// Configuration text could not be parsed.
    #[error("invalid history configuration: {detail}")]
    InvalidConfig { detail: String },

    // === Format Errors ===
    /// The byte stream ended early or is internally inconsistent.
    #[error("malformed history file: {detail}")]
    Malformed { detail: String },

    /// A bucket's occurrence count no longer fits the on-disk `u32` field.
    #[error("occurrence count overflow for signature {key}")]
    CountOverflow { key: String },

    /// The store holds more signatures than the `u32` bucket count can
    /// describe, so it cannot be encoded.
    #[error("{count} signatures exceed the history file's u32 bucket count")]
    TooManySignatures { count: usize },

    // === Resource Errors ===
    /// Reserving memory for decoded buckets or occurrences failed.
    #[error("out of memory")]
    OutOfMemory,
}

/// Coarse classification of [`HistoryError`] for callers that only need to
/// know which class of failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reading or writing the file failed.
    Io,
    /// The file contents do not follow the history layout.
    Format,
    /// The configured path or configuration text is unusable.
    FatalConfig,
    /// Resource exhaustion.
    Allocation,
}

impl HistoryError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::CannotRead { .. } | Self::CannotWrite { .. } => ErrorKind::Io,
            Self::Malformed { .. }
            | Self::CountOverflow { .. }
            | Self::TooManySignatures { .. } => ErrorKind::Format,
            Self::NotARegularFile { .. } | Self::InvalidConfig { .. } => ErrorKind::FatalConfig,
            Self::OutOfMemory => ErrorKind::Allocation,
        }
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::CannotRead { .. } | Self::CannotWrite { .. } => {
                Some("Check that the directory exists and the file permissions allow access")
            }
            Self::NotARegularFile { .. } => {
                Some("Point the alert history path at a regular file or a path that does not exist yet")
            }
            Self::Malformed { .. } => {
                Some("Move the damaged history file aside; a new one is created on the next write")
            }
            Self::InvalidConfig { .. } => Some("Fix the configuration syntax and retry"),
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 10,
            ErrorKind::Format => 11,
            ErrorKind::FatalConfig => 14,
            ErrorKind::Allocation => 7,
        }
    }

    /// Create a malformed-file error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `HistoryError`.
pub type Result<T> = std::result::Result<T, HistoryError>;
