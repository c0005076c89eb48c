use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for migration operations.
///
/// The three families a caller normally distinguishes are configuration defects
/// ([`ErrorKind::ConfigurationError`]), step failures ([`ErrorKind::TransformError`])
/// and the IO family (see [`ErrorKind::is_io`]).
///
/// # Examples
///
/// ```rust
/// use lineage::errors::{ErrorKind, MigrationError, MigrationResult};
///
/// fn example() -> MigrationResult<()> {
///     Err(MigrationError::new("no successor reaches v9", ErrorKind::ConfigurationError))
/// }
///
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::ConfigurationError);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Version table defects; never expected in a correctly released build
    /// The version registry or a plan derived from it is inconsistent
    ConfigurationError,

    // Step failures
    /// A single migration step failed to transform the store
    TransformError,

    // IO and Storage Errors
    /// Generic IO error
    IOError,
    /// The disk is full
    DiskFull,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,
    /// File data is corrupted
    FileCorrupted,

    // Data Encoding Errors
    /// Error encoding or decoding store data
    EncodingError,

    /// The operation is not valid in the current engine state
    InvalidOperation,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl ErrorKind {
    /// Returns `true` for every kind that originates from the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ErrorKind::IOError
                | ErrorKind::DiskFull
                | ErrorKind::FileNotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::FileCorrupted
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::TransformError => write!(f, "Transform error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::DiskFull => write!(f, "Disk full"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::FileCorrupted => write!(f, "File corrupted"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type returned by every fallible operation of this crate.
///
/// `MigrationError` carries a message, an [`ErrorKind`], an optional cause and the
/// backtrace captured where it was created. Errors raised by a
/// [`SchemaTransformer`](crate::migration::SchemaTransformer) are kept as the cause
/// of the `TransformError` reported to the caller.
#[derive(Clone)]
pub struct MigrationError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<MigrationError>>,
    backtrace: Atomic<Backtrace>,
}

impl MigrationError {
    /// Creates a new `MigrationError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        MigrationError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `MigrationError` wrapping `cause`.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: MigrationError) -> Self {
        MigrationError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&MigrationError> {
        self.cause.as_deref()
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// `MigrationResult<T>` is shorthand for `Result<T, MigrationError>`.
pub type MigrationResult<T> = Result<T, MigrationError>;

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::StorageFull => ErrorKind::DiskFull,
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                ErrorKind::FileCorrupted
            }
            _ => ErrorKind::IOError,
        };
        MigrationError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::string::FromUtf8Error> for MigrationError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        MigrationError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for MigrationError {
    fn from(msg: String) -> Self {
        MigrationError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for MigrationError {
    fn from(msg: &str) -> Self {
        MigrationError::new(msg, ErrorKind::InternalError)
    }
}
