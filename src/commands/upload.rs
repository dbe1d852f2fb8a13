//! `upload` command: push one file, then show the refreshed feed.

use crate::commands::feed::print_snapshot;
use crate::errors::ClientResult;
use crate::state::AppStateManager;
use crate::types::{UploadOutcome, UploadProtocol, UploadRequest};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// How long to wait for the post-upload refresh before giving up on printing it
const REFRESH_WAIT: Duration = Duration::from_secs(10);

pub async fn upload_file(
    state: &AppStateManager,
    path: &Path,
    protocol: UploadProtocol,
) -> ClientResult<ExitCode> {
    let request = UploadRequest::from_path(path).await?;
    info!("Uploading {} ({} bytes) via {}", request.filename(), request.payload().len(), protocol);

    let mut feed = state.feed.subscribe();

    let outcome = upload_until_interrupted(state, request, protocol).await;

    match outcome {
        UploadOutcome::Success(receipt) => {
            println!(
                "Uploaded via {} (job: {}, object: {})",
                receipt.protocol,
                receipt.job_id.as_deref().unwrap_or("-"),
                receipt.object_name.as_deref().unwrap_or("-"),
            );

            match tokio::time::timeout(REFRESH_WAIT, feed.changed()).await {
                Ok(Ok(())) => print_snapshot(&state.feed.snapshot()),
                _ => warn!("Feed did not refresh within {:?}", REFRESH_WAIT),
            }
            Ok(ExitCode::SUCCESS)
        }
        UploadOutcome::Failure(reason) => {
            eprintln!("Upload failed: {}", reason);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run the upload, aborting it on Ctrl-C
async fn upload_until_interrupted(
    state: &AppStateManager,
    request: UploadRequest,
    protocol: UploadProtocol,
) -> UploadOutcome {
    let upload = state.upload_and_refresh(request, protocol);
    tokio::pin!(upload);

    tokio::select! {
        outcome = &mut upload => outcome,
        _ = tokio::signal::ctrl_c() => {
            state.uploads.abort();
            upload.await
        }
    }
}
