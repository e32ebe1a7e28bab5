//! Error types for sidecar operations.
//!
//! Every error raised below the dispatcher is one of these variants. The
//! dispatcher renders them through `Display`, so the messages here are the
//! exact strings a host sees in the `error` field of a response.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sidecar operations.
pub type SidecarResult<T> = Result<T, SidecarError>;

/// Main error type for all sidecar operations.
#[derive(Error, Debug)]
pub enum SidecarError {
    /// Top-level request could not be decoded.
    #[error("Invalid JSON: {0}")]
    Parse(String),

    /// Required envelope field is absent.
    #[error("Missing '{0}' field")]
    MissingField(String),

    /// Command name is not recognized by the router.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Required payload key is absent or empty.
    #[error("Missing '{0}' in payload")]
    MissingArgument(String),

    /// Payload is present but unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Input file does not exist.
    #[error(
        "File not found: {path} (absolute: {}, parent directory exists: {parent_exists})",
        .absolute.display()
    )]
    FileNotFound {
        path: String,
        absolute: PathBuf,
        parent_exists: bool,
    },

    /// Document or embedded image could not be decoded.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource store operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A plugin returned an error.
    #[error("Plugin '{name}' failed: {message}")]
    Plugin { name: String, message: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Routing (ROUTE_xxx)
    RouteUnknownCommand,

    // Validation (VAL_xxx)
    ValMissingArgument,
    ValInvalidArgument,

    // Filesystem (FS_xxx)
    FsNotFound,
    FsIo,

    // Extraction (EXT_xxx)
    ExtDecodeFailed,

    // Database (DB_xxx)
    DbOperationFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Plugins (PLG_xxx)
    PlgFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::RouteUnknownCommand => "ROUTE_001",
            ErrorCode::ValMissingArgument => "VAL_001",
            ErrorCode::ValInvalidArgument => "VAL_002",
            ErrorCode::FsNotFound => "FS_001",
            ErrorCode::FsIo => "FS_002",
            ErrorCode::ExtDecodeFailed => "EXT_001",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::PlgFailed => "PLG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl SidecarError {
    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create a plugin error.
    pub fn plugin(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::ParseInvalidJson,
            Self::MissingField(_) => ErrorCode::ParseMissingField,
            Self::UnknownCommand(_) => ErrorCode::RouteUnknownCommand,
            Self::MissingArgument(_) => ErrorCode::ValMissingArgument,
            Self::InvalidArgument(_) => ErrorCode::ValInvalidArgument,
            Self::FileNotFound { .. } => ErrorCode::FsNotFound,
            Self::Io(_) => ErrorCode::FsIo,
            Self::Extraction(_) => ErrorCode::ExtDecodeFailed,
            Self::Database { .. } => ErrorCode::DbOperationFailed,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Plugin { .. } => ErrorCode::PlgFailed,
            Self::Serialization(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether this error means the request itself could not be read.
    ///
    /// Only these errors end the process with a non-zero status.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

impl From<rusqlite::Error> for SidecarError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
