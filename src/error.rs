use thiserror::Error;

/// Type alias for Result with SorterError
pub type Result<T> = std::result::Result<T, SorterError>;

/// Error types for the inbox sorter
#[derive(Error, Debug)]
pub enum SorterError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed (token unavailable or rejected)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Classifier returned output the sorter cannot interpret
    #[error("Classifier parse error: {0}")]
    ParseError(String),

    /// Classifier call failed
    #[error("Classification error: {0}")]
    ClassificationError(String),

    /// Label-related errors
    #[error("Label error: {0}")]
    LabelError(String),

    /// A stored item exceeds the per-item storage quota
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Key-value store errors
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A sort or reset run is already holding the run lock
    #[error("Another run is already in progress")]
    LockContention,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SorterError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SorterError::RateLimitExceeded { .. }
                | SorterError::ServerError { .. }
                | SorterError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<google_gmail1::Error> for SorterError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    401 => SorterError::AuthError(message),
                    429 => SorterError::RateLimitExceeded { retry_after: 5 },
                    404 => SorterError::NotFound("Resource not found".to_string()),
                    400 => SorterError::BadRequest(message),
                    403 => SorterError::Forbidden(message),
                    500..=599 => SorterError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => SorterError::ApiError(message),
                }
            }
            // BadRequest variant (request not understood by server)
            google_gmail1::Error::BadRequest(ref err) => SorterError::BadRequest(format!("{}", err)),
            // Network/connection errors - transient
            google_gmail1::Error::HttpError(ref err) => {
                SorterError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => SorterError::NetworkError(err.to_string()),
            _ => SorterError::ApiError(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for SorterError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            return SorterError::NetworkError(error.to_string());
        }
        if let Some(status) = error.status() {
            let code = status.as_u16();
            return match code {
                401 | 403 => SorterError::AuthError(error.to_string()),
                429 => SorterError::RateLimitExceeded { retry_after: 5 },
                500..=599 => SorterError::ServerError {
                    status: code,
                    message: error.to_string(),
                },
                _ => SorterError::ClassificationError(error.to_string()),
            };
        }
        SorterError::ClassificationError(error.to_string())
    }
}
