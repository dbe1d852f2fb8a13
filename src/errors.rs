use thiserror::Error;

/// Errors raised while talking to the image backend or its storage collaborator.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected request with status {status}: {body}")]
    ServerRejected { status: u16, body: String },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("No presigned upload URL in authorization response")]
    NoPresignedUrl,

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Upload aborted")]
    Aborted,

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse classification used by callers deciding how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable upload URL was obtained.
    AuthorizationFailure,
    TransportFailure,
    MalformedResponse,
    ServerRejected,
    Aborted,
    Invalid,
}

impl ClientError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(endpoint: &str, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_url(url: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NoPresignedUrl => ErrorKind::AuthorizationFailure,
            ClientError::Transport(_) | ClientError::Io(_) => ErrorKind::TransportFailure,
            ClientError::MalformedResponse { .. } | ClientError::Json(_) => {
                ErrorKind::MalformedResponse
            }
            ClientError::ServerRejected { .. } => ErrorKind::ServerRejected,
            ClientError::Aborted => ErrorKind::Aborted,
            ClientError::InvalidUrl { .. }
            | ClientError::Validation { .. }
            | ClientError::Config(_) => ErrorKind::Invalid,
        }
    }
}
