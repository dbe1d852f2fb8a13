/**
 * API Contract Types for the Image Feed Uploader
 *
 * These types define the exact structure of the JSON bodies exchanged with
 * the resize backend. Anything the backend sends is validated here, at the
 * boundary, so the rest of the crate never touches an undefined field.
 *
 * Principles:
 * - Use explicit Option<T> for fields the backend may omit
 * - Use serde attributes to match JSON format exactly
 * - Reject empty strings where the value must be usable (e.g. upload URLs)
 */

use serde::{Deserialize, Serialize};

// =============================================================================
// Feed Listing Endpoint
// =============================================================================

/// Response from GET /api/resized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedListResponse {
    pub images: Vec<String>,   // Display order as returned by the backend
}

// =============================================================================
// Direct Upload Endpoint
// =============================================================================

/// Response from POST /api/upload (202 Accepted)
///
/// The body is implementation-defined, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadAcceptedResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub object_name: Option<String>,
}

// =============================================================================
// Presigned Upload Endpoint
// =============================================================================

/// Request to authorize a presigned upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresignedUploadRequest {
    pub filename: String,
    pub content_type: String,
}

/// Response from POST /api/presigned-upload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PresignedUploadResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub object_name: Option<String>,
}

impl PresignedUploadResponse {
    /// The upload URL, if present and non-blank
    pub fn usable_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

// =============================================================================
// Job Status Endpoint
// =============================================================================

/// Processing state of a resize job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Response from GET /api/jobs/{job_id}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub id: String,
    pub filename: String,               // Object key in the upload bucket
    #[serde(default)]
    pub original_filename: Option<String>,
    pub status: JobState,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,     // ISO 8601 timestamp
    #[serde(default)]
    pub updated_at: Option<String>,     // ISO 8601 timestamp
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned alongside 4xx responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Tests
// =============================================================================
