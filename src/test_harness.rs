//! Integration test harness for mock API servers
//!
//! Stands in for both the resize backend and the object-storage
//! collaborator, so upload and feed tests run without real infrastructure.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

/// A test harness that sets up a mock backend for integration testing
pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    /// Create a new test harness with a mock server
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Get the mock server URL
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mock GET /api/resized returning the given feed
    pub fn mock_feed(&mut self, images: Vec<&str>) -> Mock {
        self.server.mock("GET", "/api/resized")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "images": images }).to_string())
            .create()
    }

    /// Mock GET /api/resized with an arbitrary status and body
    pub fn mock_feed_body(&mut self, status: usize, body: &str) -> Mock {
        self.server.mock("GET", "/api/resized")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    /// Mock GET /api/resized/{id} serving image bytes
    pub fn mock_resized_image(&mut self, id: &str, bytes: &[u8]) -> Mock {
        self.server.mock("GET", format!("/api/resized/{}", id).as_str())
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(bytes)
            .create()
    }

    /// Mock POST /api/upload accepting a multipart `image` field
    pub fn mock_direct_upload_accepted(&mut self, job_id: &str, object_name: &str) -> Mock {
        self.server.mock("POST", "/api/upload")
            .match_header("content-type", Matcher::Regex(r"^multipart/form-data; boundary=.+".to_string()))
            .match_body(Matcher::Regex(r#"name="image"; filename="#.to_string()))
            .with_status(202)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "message": "Image received, resizing in background.",
                "job_id": job_id,
                "object_name": object_name
            }).to_string())
            .create()
    }

    /// Mock POST /api/upload rejecting the request
    pub fn mock_direct_upload_failure(&mut self, status: usize, error_message: &str) -> Mock {
        self.server.mock("POST", "/api/upload")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": error_message }).to_string())
            .create()
    }

    /// Mock POST /api/presigned-upload issuing `url`
    pub fn mock_presign_success(&mut self, url: &str, job_id: &str, object_name: &str) -> Mock {
        self.server.mock("POST", "/api/presigned-upload")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Regex(r#""filename":".+","content_type":".+""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "url": url,
                "job_id": job_id,
                "object_name": object_name
            }).to_string())
            .create()
    }

    /// Mock POST /api/presigned-upload with an arbitrary status and body
    pub fn mock_presign_body(&mut self, status: usize, body: &str) -> Mock {
        self.server.mock("POST", "/api/presigned-upload")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    /// Mock the storage collaborator accepting exactly one PUT of `body`
    pub fn mock_storage_put(&mut self, path: &str, content_type: &str, body: &str) -> Mock {
        self.server.mock("PUT", path)
            .match_header("content-type", content_type)
            .match_body(Matcher::Exact(body.to_string()))
            .with_status(200)
            .expect(1)
            .create()
    }

    /// Mock a storage endpoint that must never be hit
    pub fn mock_storage_put_never(&mut self) -> Mock {
        self.server.mock("PUT", Matcher::Any)
            .with_status(200)
            .expect(0)
            .create()
    }

    /// Mock GET /api/jobs/{job_id}
    pub fn mock_job_status(&mut self, job_id: &str, status: &str) -> Mock {
        self.server.mock("GET", format!("/api/jobs/{}", job_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "id": job_id,
                "filename": format!("{}_photo.png", job_id),
                "original_filename": "photo.png",
                "status": status,
                "error_message": null,
                "created_at": "2025-01-01T00:00:00Z",
                "updated_at": "2025-01-01T00:00:02Z"
            }).to_string())
            .create()
    }

    /// Mock a 404 for an unknown job
    pub fn mock_job_missing(&mut self, job_id: &str) -> Mock {
        self.server.mock("GET", format!("/api/jobs/{}", job_id).as_str())
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": "Job not found" }).to_string())
            .create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiClient;
    use crate::api_contracts::JobState;
    use crate::errors::ClientError;
    use crate::feed_sync::{FeedSynchronizer, SyncConfig};
    use crate::types::ImageRef;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_list_feed_with_mock_server() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_feed(vec!["a.png", "b.png"]);

        let client = ApiClient::new(harness.url());
        let images = assert_ok!(client.list_feed().await);

        assert_eq!(images, vec![ImageRef::from("a.png"), ImageRef::from("b.png")]);
    }

    #[tokio::test]
    async fn test_list_feed_invalid_json_is_malformed() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_feed_body(200, "<html>oops</html>");

        let client = ApiClient::new(harness.url());
        let result = client.list_feed().await;

        assert!(matches!(result, Err(ClientError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_list_feed_missing_images_is_malformed() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_feed_body(200, r#"{"files": []}"#);

        let client = ApiClient::new(harness.url());
        let result = client.list_feed().await;

        assert!(matches!(result, Err(ClientError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_list_feed_server_error() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_feed_body(500, r#"{"error": "boom"}"#);

        let client = ApiClient::new(harness.url());
        let result = client.list_feed().await;

        assert!(matches!(result, Err(ClientError::ServerRejected { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_fetch_image_with_mock_server() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_resized_image("resized_cat.jpg", b"\xff\xd8\xff jpeg");

        let client = ApiClient::new(harness.url());
        let bytes = assert_ok!(client.fetch_image(&ImageRef::from("resized_cat.jpg")).await);

        assert_eq!(bytes, b"\xff\xd8\xff jpeg");
    }

    #[tokio::test]
    async fn test_fetch_missing_image() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.server.mock("GET", "/api/resized/nope.jpg")
            .with_status(404)
            .with_body(json!({ "error": "Image not found" }).to_string())
            .create();

        let client = ApiClient::new(harness.url());
        let result = client.fetch_image(&ImageRef::from("nope.jpg")).await;

        assert!(matches!(result, Err(ClientError::ServerRejected { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_job_status_with_mock_server() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_job_status("job-42", "processing");

        let client = ApiClient::new(harness.url());
        let job = assert_ok!(client.job_status("job-42").await);

        assert_eq!(job.id, "job-42");
        assert_eq!(job.status, JobState::Processing);
        assert_eq!(job.original_filename.as_deref(), Some("photo.png"));
    }

    #[tokio::test]
    async fn test_job_status_not_found() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_job_missing("nonexistent-id");

        let client = ApiClient::new(harness.url());
        let result = client.job_status("nonexistent-id").await;

        match result {
            Err(ClientError::ServerRejected { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("Job not found"));
            }
            other => panic!("Expected 404 rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_feed_end_to_end_order_and_resolution() {
        let mut harness = TestHarness::new().await;
        let _feed = harness.mock_feed(vec!["a.png", "b.png"]);
        let _a = harness.mock_resized_image("a.png", b"image-a");
        let _b = harness.mock_resized_image("b.png", b"image-b");

        let client = Arc::new(ApiClient::new(harness.url()));
        let sync = FeedSynchronizer::new(client.clone(), SyncConfig::default());
        let mut rx = sync.subscribe();

        sync.start();
        rx.changed().await.unwrap();
        sync.stop();

        let snapshot = sync.snapshot();
        let ids: Vec<&str> = snapshot.images.iter().map(ImageRef::as_str).collect();
        assert_eq!(ids, vec!["a.png", "b.png"]);

        assert_eq!(
            client.image_url(&snapshot.images[0]).unwrap().as_str(),
            format!("{}/api/resized/a.png", harness.url())
        );
        assert_eq!(client.fetch_image(&snapshot.images[0]).await.unwrap(), b"image-a");
        assert_eq!(client.fetch_image(&snapshot.images[1]).await.unwrap(), b"image-b");
    }
}
