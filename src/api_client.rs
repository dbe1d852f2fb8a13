use crate::api_contracts::{
    ErrorResponse, FeedListResponse, JobStatusResponse, PresignedUploadRequest,
    PresignedUploadResponse, UploadAcceptedResponse,
};
use crate::config_utils::ClientConfig;
use crate::errors::{ClientError, ClientResult};
use crate::feed_sync::FeedSource;
use crate::types::{ImageRef, UploadRequest, UploadSession};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Multipart field the backend reads the uploaded file from
const UPLOAD_FIELD: &str = "image";

/// HTTP client for the resize backend and its storage collaborator
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client with the default 60 second timeout
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_timeout(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        // Include version in User-Agent header for tracking
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("ImageFeedUploader/{}", version);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get URL for the feed listing endpoint
    pub fn feed_url(&self) -> String {
        self.endpoint("/api/resized")
    }

    /// Resolve an image reference to its displayable resource URL.
    ///
    /// The id is pushed as a single path segment so keys containing
    /// spaces or slashes stay one segment.
    pub fn image_url(&self, image: &ImageRef) -> ClientResult<reqwest::Url> {
        let feed_url = self.feed_url();
        let mut url = reqwest::Url::parse(&feed_url)
            .map_err(|e| ClientError::invalid_url(&feed_url, e))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_url(&feed_url, "cannot be a base URL"))?
            .push(image.as_str());

        Ok(url)
    }

    /// Fetch the resized image bytes for a feed entry
    pub async fn fetch_image(&self, image: &ImageRef) -> ClientResult<Vec<u8>> {
        let url = self.image_url(image)?;

        let response = self.client.get(url).send().await?;
        let response = reject_unless_success(response).await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Stream a resized image straight to `out`, returning the bytes written.
    ///
    /// Nothing is created on disk unless the backend answers 2xx; a transfer
    /// that breaks midway removes the partial file.
    pub async fn download_image(&self, image: &ImageRef, out: &Path) -> ClientResult<u64> {
        let url = self.image_url(image)?;

        let response = self.client.get(url).send().await?;
        let response = reject_unless_success(response).await?;

        let mut file = tokio::fs::File::create(out).await?;
        let written = match write_body(response, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(out).await;
                return Err(e);
            }
        };

        debug!(image = %image, bytes = written, "Downloaded image");
        Ok(written)
    }

    /// Fetch the current feed listing
    pub async fn list_feed(&self) -> ClientResult<Vec<ImageRef>> {
        let url = self.feed_url();

        let response = self.client.get(&url).send().await?;
        let response = reject_unless_success(response).await?;

        let body = response.text().await?;
        let data: FeedListResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::malformed("/api/resized", e))?;

        Ok(data.images.into_iter().map(ImageRef::new).collect())
    }

    /// Single-phase upload: one multipart POST carrying the file
    pub async fn upload_direct(&self, request: UploadRequest) -> ClientResult<UploadAcceptedResponse> {
        let url = self.endpoint("/api/upload");
        let filename = request.filename().to_string();
        let content_type = request.content_type().to_string();

        let part = reqwest::multipart::Part::bytes(request.into_payload())
            .file_name(filename)
            .mime_str(&content_type)
            .map_err(|e| ClientError::validation("content_type", &e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part(UPLOAD_FIELD, part);

        debug!(%url, "Sending direct upload");

        let response = self.client
            .post(&url)
            .multipart(form)
            .send()
            .await?;

        let response = reject_unless_success(response).await?;

        // Body shape is up to the backend; a receipt is best effort
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Phase one of a presigned upload: ask the backend for a write URL
    pub async fn request_presigned_url(&self, request: &UploadRequest) -> ClientResult<UploadSession> {
        let url = self.endpoint("/api/presigned-upload");

        let body = PresignedUploadRequest {
            filename: request.filename().to_string(),
            content_type: request.content_type().to_string(),
        };

        let response = self.client
            .post(&url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "Presign request refused");
            return Err(ClientError::NoPresignedUrl);
        }

        let data: PresignedUploadResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Presign response was not the expected JSON");
                return Err(ClientError::NoPresignedUrl);
            }
        };

        let raw_url = data.usable_url().ok_or(ClientError::NoPresignedUrl)?;
        let target_url = match reqwest::Url::parse(raw_url) {
            Ok(target_url) => target_url,
            Err(e) => {
                warn!(url = raw_url, error = %e, "Presigned URL is not absolute");
                return Err(ClientError::NoPresignedUrl);
            }
        };

        Ok(UploadSession {
            target_url,
            expected_content_type: request.content_type().to_string(),
            job_id: data.job_id,
            object_name: data.object_name,
        })
    }

    /// Phase two of a presigned upload: PUT the raw bytes to storage.
    ///
    /// Consumes the session; a presigned URL is never reused.
    pub async fn transfer_presigned(&self, session: UploadSession, payload: Vec<u8>) -> ClientResult<()> {
        debug!(host = ?session.target_url.host_str(), bytes = payload.len(), "Transferring to storage");

        let response = self.client
            .put(session.target_url)
            .header(CONTENT_TYPE, session.expected_content_type)
            .body(payload)
            .send()
            .await?;

        reject_unless_success(response).await?;
        Ok(())
    }

    /// Look up a resize job by id
    pub async fn job_status(&self, job_id: &str) -> ClientResult<JobStatusResponse> {
        let base = self.endpoint("/api/jobs");
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| ClientError::invalid_url(&base, e))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::invalid_url(&base, "cannot be a base URL"))?
            .push(job_id);

        let response = self.client.get(url).send().await?;
        let response = reject_unless_success(response).await?;

        let body = response.text().await?;
        let data: JobStatusResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::malformed("/api/jobs", e))?;

        info!(job_id, status = ?data.status, "Fetched job status");
        Ok(data)
    }
}

#[async_trait]
impl FeedSource for ApiClient {
    async fn list_feed(&self) -> ClientResult<Vec<ImageRef>> {
        ApiClient::list_feed(self).await
    }
}

/// Copy a response body into `file` chunk by chunk
async fn write_body(response: reqwest::Response, file: &mut tokio::fs::File) -> ClientResult<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Turn any non-2xx response into `ServerRejected`.
///
/// Keeps the backend's `{"error": ...}` message when there is one, else the raw body.
async fn reject_unless_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(error) => error.error,
        Err(_) => text,
    };
    Err(ClientError::ServerRejected {
        status: status.as_u16(),
        body,
    })
}
