//! Error types for rup

use thiserror::Error;

/// Error kinds reported by an upload session.
///
/// The numeric codes are stable and may be shown to users or persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote service could not be reached or answered unexpectedly
    ConnectionFailure,
    /// The service rejected the identity/secret pair
    InvalidCredentials,
    /// No upload authorization could be obtained
    TokenError,
    /// Another operation is already in flight
    Busy,
    /// Upload attempted without a successful login or saved credentials
    NotAuthenticated,
    /// The operation was cancelled by the caller
    Cancelled,
    /// The service received the upload but refused it
    UploadRejected,
}

impl ErrorKind {
    /// Stable numeric identifier
    pub fn code(&self) -> i64 {
        match self {
            ErrorKind::ConnectionFailure => 10,
            ErrorKind::InvalidCredentials => 20,
            ErrorKind::TokenError => 30,
            ErrorKind::Busy => 40,
            ErrorKind::NotAuthenticated => 50,
            ErrorKind::Cancelled => 60,
            ErrorKind::UploadRejected => 70,
        }
    }

    /// Look up a kind by its numeric identifier
    pub fn from_code(code: i64) -> Option<ErrorKind> {
        match code {
            10 => Some(ErrorKind::ConnectionFailure),
            20 => Some(ErrorKind::InvalidCredentials),
            30 => Some(ErrorKind::TokenError),
            40 => Some(ErrorKind::Busy),
            50 => Some(ErrorKind::NotAuthenticated),
            60 => Some(ErrorKind::Cancelled),
            70 => Some(ErrorKind::UploadRejected),
            _ => None,
        }
    }
}

/// Main error type for rup operations
#[derive(Debug, Error)]
pub enum RupError {
    #[error("Cannot create connection: {0}")]
    ConnectionFailure(String),

    #[error("Wrong credentials")]
    InvalidCredentials,

    #[error("Upload token error: {0}")]
    TokenError(String),

    #[error("Another operation is already in progress")]
    Busy,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Developer key is missing")]
    MissingDeveloperKey,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl RupError {
    /// Session error kind, if this error is one a session reports
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RupError::ConnectionFailure(_) => Some(ErrorKind::ConnectionFailure),
            RupError::InvalidCredentials => Some(ErrorKind::InvalidCredentials),
            RupError::TokenError(_) => Some(ErrorKind::TokenError),
            RupError::Busy => Some(ErrorKind::Busy),
            RupError::NotAuthenticated => Some(ErrorKind::NotAuthenticated),
            RupError::Cancelled => Some(ErrorKind::Cancelled),
            RupError::UploadRejected(_) => Some(ErrorKind::UploadRejected),
            _ => None,
        }
    }

    /// Stable numeric code of the error kind
    pub fn code(&self) -> Option<i64> {
        self.kind().map(|kind| kind.code())
    }

    /// Check if the error was raised before any network interaction
    pub fn is_precondition(&self) -> bool {
        matches!(self, RupError::Busy | RupError::NotAuthenticated)
    }
}
