//! `watch` and `fetch` commands.

use crate::errors::ClientResult;
use crate::state::AppStateManager;
use crate::types::{FeedSnapshot, ImageRef};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on waiting for the first snapshot in `watch --once`
const FIRST_SNAPSHOT_WAIT: Duration = Duration::from_secs(30);

pub fn print_snapshot(snapshot: &FeedSnapshot) {
    let fetched_at = snapshot
        .fetched_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    println!("Feed #{} ({} images, fetched {})", snapshot.sequence, snapshot.len(), fetched_at);
    for image in &snapshot.images {
        println!("  {}", image);
    }
}

/// Poll the feed and print each committed snapshot until Ctrl-C
pub async fn watch(state: &AppStateManager, once: bool) -> ClientResult<ExitCode> {
    let mut feed = state.feed.subscribe();
    state.feed.start();

    if once {
        let result = tokio::time::timeout(FIRST_SNAPSHOT_WAIT, feed.changed()).await;
        state.feed.stop();
        return match result {
            Ok(Ok(())) => {
                print_snapshot(&state.feed.snapshot());
                Ok(ExitCode::SUCCESS)
            }
            _ => {
                warn!("No feed snapshot within {:?}", FIRST_SNAPSHOT_WAIT);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = feed.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = feed.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
        }
    }

    state.feed.stop();
    let stats = state.feed.stats();
    info!(
        started = stats.polls_started,
        applied = stats.polls_applied,
        failed = stats.polls_failed,
        discarded = stats.polls_discarded,
        "Watch finished"
    );
    Ok(ExitCode::SUCCESS)
}

/// Download one resized image to `out`
pub async fn fetch(state: &AppStateManager, id: &str, out: &Path) -> ClientResult<ExitCode> {
    let image = ImageRef::new(id);
    let written = state.api_client.download_image(&image, out).await?;
    println!("Saved {} ({} bytes) to {}", image, written, out.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiClient;
    use crate::errors::ClientError;
    use crate::feed_sync::SyncConfig;
    use crate::state::SyncState;
    use crate::test_harness::TestHarness;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state_for(harness: &TestHarness) -> AppStateManager {
        AppStateManager::with_client(Arc::new(ApiClient::new(harness.url())), SyncConfig::default())
    }

    #[tokio::test]
    async fn test_watch_once_stops_after_first_snapshot() {
        let mut harness = TestHarness::new().await;
        let _feed = harness.mock_feed(vec!["a.png", "b.png"]);
        let state = state_for(&harness);

        let code = watch(&state, true).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(state.feed.state(), SyncState::Stopped);
        assert_eq!(state.feed.snapshot().images, vec![ImageRef::from("a.png"), ImageRef::from("b.png")]);
    }

    #[tokio::test]
    async fn test_fetch_writes_file() {
        let mut harness = TestHarness::new().await;
        let _image = harness.mock_resized_image("resized_cat.png", b"resized-bytes");
        let state = state_for(&harness);

        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("cat.png");
        let code = fetch(&state, "resized_cat.png", &out).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(std::fs::read(&out).unwrap(), b"resized-bytes");
    }

    #[tokio::test]
    async fn test_fetch_missing_image_propagates() {
        let mut harness = TestHarness::new().await;
        let _missing = harness.server.mock("GET", "/api/resized/gone.png")
            .with_status(404)
            .create();
        let state = state_for(&harness);

        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("gone.png");
        let result = fetch(&state, "gone.png", &out).await;

        assert!(matches!(result, Err(ClientError::ServerRejected { status: 404, .. })));
        assert!(!out.exists());
    }
}
