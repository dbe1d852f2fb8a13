//! Core domain types for uploads and the resized-image feed.
//!
//! Requests and outcomes flow through the upload coordinator; image
//! references and snapshots are owned by the feed synchronizer.

use crate::errors::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Content type used when the caller does not know the file's type
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file selected for upload. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    filename: String,
    content_type: String,
    payload: Vec<u8>,
}

impl UploadRequest {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<&str>,
        payload: Vec<u8>,
    ) -> ClientResult<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(ClientError::validation("filename", "must not be empty"));
        }

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Ok(Self {
            filename,
            content_type,
            payload,
        })
    }

    /// Read a file from disk, inferring the content type from its extension
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::validation("filename", "path has no valid file name"))?
            .to_string();

        let payload = tokio::fs::read(path).await?;
        Self::new(filename, content_type_for_path(path), payload)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Guess an image MIME type from a file extension
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(content_type)
}

/// Which of the two upload protocols to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadProtocol {
    /// Single multipart POST to the backend
    Direct,
    /// Authorize with the backend, then PUT straight to storage
    Presigned,
}

impl fmt::Display for UploadProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadProtocol::Direct => write!(f, "direct"),
            UploadProtocol::Presigned => write!(f, "presigned"),
        }
    }
}

impl FromStr for UploadProtocol {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(UploadProtocol::Direct),
            "presigned" => Ok(UploadProtocol::Presigned),
            other => Err(ClientError::validation(
                "protocol",
                &format!("unknown protocol '{}'", other),
            )),
        }
    }
}

/// Write authorization for one presigned transfer.
///
/// Lives only between the authorize and transfer steps of a single upload.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadSession {
    pub target_url: reqwest::Url,
    pub expected_content_type: String,
    pub job_id: Option<String>,
    pub object_name: Option<String>,
}

/// What the backend told us about an accepted upload
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UploadReceipt {
    pub protocol: UploadProtocol,
    pub job_id: Option<String>,
    pub object_name: Option<String>,
}

/// Why an upload attempt ended without storing the file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    NoPresignedUrl,
    TransportError { message: String },
    ServerRejected { status: u16 },
    Aborted,
    InvalidRequest { message: String },
    /// Another upload is already in flight on this coordinator
    Busy,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoPresignedUrl => write!(f, "no presigned URL was issued"),
            FailureReason::TransportError { message } => write!(f, "transport error: {}", message),
            FailureReason::ServerRejected { status } => write!(f, "server rejected upload ({})", status),
            FailureReason::Aborted => write!(f, "upload aborted"),
            FailureReason::InvalidRequest { message } => write!(f, "invalid request: {}", message),
            FailureReason::Busy => write!(f, "another upload is in progress"),
        }
    }
}

impl From<&ClientError> for FailureReason {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::NoPresignedUrl => FailureReason::NoPresignedUrl,
            ClientError::Aborted => FailureReason::Aborted,
            ClientError::ServerRejected { status, .. } => FailureReason::ServerRejected { status: *status },
            ClientError::Transport(_)
            | ClientError::Io(_)
            | ClientError::MalformedResponse { .. }
            | ClientError::Json(_) => FailureReason::TransportError {
                message: error.to_string(),
            },
            ClientError::InvalidUrl { .. }
            | ClientError::Validation { .. }
            | ClientError::Config(_) => FailureReason::InvalidRequest {
                message: error.to_string(),
            },
        }
    }
}

/// Terminal result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum UploadOutcome {
    Success(UploadReceipt),
    Failure(FailureReason),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            UploadOutcome::Success(_) => None,
            UploadOutcome::Failure(reason) => Some(reason),
        }
    }
}

/// Opaque key of a resized image, resolvable via `/api/resized/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A complete view of the feed as of one successful poll
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FeedSnapshot {
    pub images: Vec<ImageRef>,
    /// `None` until the first successful poll
    pub fetched_at: Option<DateTime<Utc>>,
    /// Monotonic poll number that produced this snapshot (0 = initial empty)
    pub sequence: u64,
}

impl FeedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}
