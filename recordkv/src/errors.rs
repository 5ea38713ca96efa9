use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for record store operations.
///
/// Each kind describes one category of failure. Two outcomes are deliberately
/// absent from this list: a lookup that matches nothing is `Ok(None)`, and a
/// commit refused by the store is a [`CommitResult`](crate::store::CommitResult)
/// with `ok == false`.
///
/// # Examples
///
/// ```rust,ignore
/// use recordkv::errors::{RecordError, ErrorKind, RecordResult};
///
/// fn example() -> RecordResult<()> {
///     Err(RecordError::new("Index not declared", ErrorKind::UnknownIndex))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Validation Errors
    /// A value does not satisfy its field descriptor
    ValidationError,
    /// Invalid field name
    InvalidFieldName,
    /// A value is not of the kind its field declares
    InvalidDataType,
    /// A required field is missing
    MissingRequiredField,

    // Collection Errors
    /// An index is declared on a field the shape does not have
    UnknownIndex,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// A collection with the same name but a different layout is already open
    CollectionAlreadyExists,

    // Store Errors
    /// Error from storage backend
    BackendError,
    /// Store has already been closed
    StoreAlreadyClosed,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::MissingRequiredField => write!(f, "Missing required field"),
            ErrorKind::UnknownIndex => write!(f, "Unknown index"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::CollectionAlreadyExists => write!(f, "Collection already exists"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the record store.
///
/// `RecordError` carries a message, a kind, the dotted path of the offending
/// field for validation failures, and an optional cause. A backtrace is
/// captured at construction and printed by the `Debug` impl.
///
/// # Examples
///
/// ```rust,ignore
/// use recordkv::errors::{RecordError, ErrorKind};
///
/// let err = RecordError::validation("password", "must be at least 8 characters long");
/// assert_eq!(err.kind(), &ErrorKind::ValidationError);
/// assert_eq!(err.field_path(), Some("password"));
/// ```
#[derive(Clone)]
pub struct RecordError {
    message: String,
    error_kind: ErrorKind,
    field_path: Option<String>,
    cause: Option<Box<RecordError>>,
    backtrace: Atomic<Backtrace>,
}

impl RecordError {
    /// Creates a new `RecordError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RecordError {
            message: message.to_string(),
            error_kind,
            field_path: None,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `RecordError` wrapping an underlying cause.
    pub fn new_with_cause(message: &str, error_type: ErrorKind, cause: RecordError) -> Self {
        RecordError {
            message: message.to_string(),
            error_kind: error_type,
            field_path: None,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a validation failure for the field at `path`.
    ///
    /// The message reads `"<path>: <reason>"`.
    pub fn validation(path: &str, reason: &str) -> Self {
        Self::field_error(path, reason, ErrorKind::ValidationError)
    }

    /// Creates an error of `error_kind` attached to the field at `path`.
    pub fn field_error(path: &str, reason: &str, error_kind: ErrorKind) -> Self {
        RecordError {
            message: format!("{}: {}", path, reason),
            error_kind,
            field_path: Some(path.to_string()),
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    /// Dotted path of the field that failed validation, if any.
    pub fn field_path(&self) -> Option<&str> {
        self.field_path.as_deref()
    }

    pub fn cause(&self) -> Option<&RecordError> {
        self.cause.as_deref()
    }

    /// Returns true for the kinds raised by shape validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::ValidationError
                | ErrorKind::MissingRequiredField
                | ErrorKind::InvalidDataType
                | ErrorKind::InvalidFieldName
        )
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for record store operations.
pub type RecordResult<T> = Result<T, RecordError>;

impl From<std::fmt::Error> for RecordError {
    fn from(err: std::fmt::Error) -> Self {
        RecordError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<regex::Error> for RecordError {
    fn from(err: regex::Error) -> Self {
        RecordError::new(
            &format!("Invalid pattern: {}", err),
            ErrorKind::InvalidOperation,
        )
    }
}

impl From<String> for RecordError {
    fn from(msg: String) -> Self {
        RecordError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RecordError {
    fn from(msg: &str) -> Self {
        RecordError::new(msg, ErrorKind::InternalError)
    }
}
