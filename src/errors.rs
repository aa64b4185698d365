use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Caller is not an administrator
    #[error("Only administrators can export logs")]
    PermissionDenied,
    /// An export is already running on this controller
    #[error("An export is already in progress")]
    ExportInProgress,
    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    HttpError { status: u16 },
    /// Transport-level failure (DNS, connection reset, timeout)
    #[error("Network error: {0}")]
    NetworkFailure(String),
    /// Reading the payload or saving it to disk failed
    #[error("Failed to save export: {0}")]
    MaterializationFailure(String),
    /// Server answered 2xx but reported a failure in its JSON envelope
    #[error("API error: {0}")]
    ApiError(String),
    /// Failed to parse a response body
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    UrlError(String),
    /// Invalid input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    IoError(String),
}

// Conversion implementations for common errors
// Status codes are checked by the caller, so every reqwest error is a transport failure.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkFailure(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::UrlError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
