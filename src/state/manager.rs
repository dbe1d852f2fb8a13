//! Application state manager wiring uploads to feed refreshes.

use std::sync::Arc;
use crate::api_client::ApiClient;
use crate::config_utils::ClientConfig;
use crate::feed_sync::{FeedSynchronizer, SyncConfig};
use crate::types::{UploadOutcome, UploadProtocol, UploadRequest};
use crate::upload_coordinator::UploadCoordinator;
use tracing::debug;

/// Owns the shared API client, the upload coordinator and the feed synchronizer
pub struct AppStateManager {
    /// HTTP client shared by uploads and polling
    pub api_client: Arc<ApiClient>,
    pub uploads: UploadCoordinator,
    pub feed: FeedSynchronizer,
}

impl AppStateManager {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Arc::new(ApiClient::from_config(config)), config.sync_config())
    }

    pub fn with_client(api_client: Arc<ApiClient>, sync_config: SyncConfig) -> Self {
        Self {
            uploads: UploadCoordinator::new(api_client.clone()),
            feed: FeedSynchronizer::new(api_client.clone(), sync_config),
            api_client,
        }
    }

    /// Upload a file and, on success, ask the feed for one immediate refresh
    pub async fn upload_and_refresh(
        &self,
        request: UploadRequest,
        protocol: UploadProtocol,
    ) -> UploadOutcome {
        let outcome = self.uploads.upload(request, protocol).await;
        if outcome.is_success() {
            debug!("Upload succeeded, refreshing feed");
            self.feed.refresh_now();
        }
        outcome
    }
}
