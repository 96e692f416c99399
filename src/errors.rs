use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Login POST was rejected by the portal
    #[error("Error: Invalid credentials")]
    AuthenticationError,
    /// Listing page for a module returned a non-success status
    #[error("Error: Unable to fetch exam papers")]
    FetchError,
    /// Listing page contained no PDF anchors
    #[error("No papers found for this module")]
    NoPapersFound,
    /// PDF anchors existed but none matched the allowed years
    #[error("No papers found for this module in years {min}-{max}")]
    NoPapersInYearRange { min: String, max: String },
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Failed to parse HTML content
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

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
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

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
