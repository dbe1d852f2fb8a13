//! `job` command.

use crate::api_contracts::{JobState, JobStatusResponse};
use crate::errors::ClientResult;
use crate::state::AppStateManager;
use std::process::ExitCode;

pub async fn show_job(state: &AppStateManager, job_id: &str) -> ClientResult<ExitCode> {
    let job = state.api_client.job_status(job_id).await?;
    println!("{}", describe_job(&job));

    let code = match job.status {
        JobState::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    };
    Ok(code)
}

fn describe_job(job: &JobStatusResponse) -> String {
    let mut line = format!(
        "Job {}: {:?} ({})",
        job.id,
        job.status,
        job.original_filename.as_deref().unwrap_or("unknown file")
    );
    if let Some(error) = &job.error_message {
        line.push_str(&format!(" - {}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiClient;
    use crate::errors::ClientError;
    use crate::feed_sync::SyncConfig;
    use crate::test_harness::TestHarness;
    use std::sync::Arc;

    fn state_for(harness: &TestHarness) -> AppStateManager {
        AppStateManager::with_client(Arc::new(ApiClient::new(harness.url())), SyncConfig::default())
    }

    #[tokio::test]
    async fn test_show_completed_job() {
        let mut harness = TestHarness::new().await;
        let _job = harness.mock_job_status("job-1", "completed");

        let code = show_job(&state_for(&harness), "job-1").await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_show_failed_job_exit_code() {
        let mut harness = TestHarness::new().await;
        let _job = harness.mock_job_status("job-2", "failed");

        let code = show_job(&state_for(&harness), "job-2").await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_show_missing_job() {
        let mut harness = TestHarness::new().await;
        let _job = harness.mock_job_missing("nope");

        let result = show_job(&state_for(&harness), "nope").await;
        assert!(matches!(result, Err(ClientError::ServerRejected { status: 404, .. })));
    }
}
