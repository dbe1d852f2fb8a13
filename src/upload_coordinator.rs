//! Upload coordination
//!
//! Drives one file through either the direct or the presigned protocol and
//! reports a single terminal outcome. Feed refreshes after a success are the
//! caller's business; nothing here touches the feed synchronizer.

use crate::api_client::ApiClient;
use crate::errors::{ClientError, ClientResult};
use crate::types::{FailureReason, UploadOutcome, UploadProtocol, UploadReceipt, UploadRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Upload status for the file currently (or last) handled
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadStatus {
    Idle,
    /// Waiting on the backend for a presigned URL
    Authorizing { filename: String },
    /// PUT to the presigned URL in progress
    Transferring { filename: String },
    /// Direct multipart POST in progress
    Uploading { filename: String },
    Completed { filename: String },
    Failed { filename: String, error: String },
}

/// Drives uploads against the backend, one at a time
pub struct UploadCoordinator {
    api: Arc<ApiClient>,
    status: Mutex<UploadStatus>,
    in_flight: AtomicBool,
    abort: Notify,
}

/// Releases the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UploadCoordinator {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            status: Mutex::new(UploadStatus::Idle),
            in_flight: AtomicBool::new(false),
            abort: Notify::new(),
        }
    }

    /// Upload one file and report how it ended.
    ///
    /// Never retries; a second call while one is in flight fails with `Busy`.
    pub async fn upload(&self, request: UploadRequest, protocol: UploadProtocol) -> UploadOutcome {
        // Registered before the in-flight flag is visible so abort() cannot be missed
        let aborted = self.abort.notified();
        tokio::pin!(aborted);
        aborted.as_mut().enable();

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!(filename = request.filename(), "Upload rejected, another upload is in flight");
            return UploadOutcome::Failure(FailureReason::Busy);
        };

        let filename = request.filename().to_string();
        let span = info_span!(
            "upload",
            attempt_id = %Uuid::new_v4(),
            %protocol,
            filename = %filename,
            bytes = request.payload().len(),
        );

        let result = async {
            info!("Starting upload");
            tokio::select! {
                biased;
                _ = aborted.as_mut() => Err(ClientError::Aborted),
                result = self.run_protocol(request, protocol) => result,
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(receipt) => {
                info!(filename = %filename, job_id = ?receipt.job_id, "Upload succeeded");
                self.set_status(UploadStatus::Completed {
                    filename: filename.clone(),
                });
                UploadOutcome::Success(receipt)
            }
            Err(e) => {
                warn!(filename = %filename, error = %e, "Upload failed");
                self.set_status(UploadStatus::Failed {
                    filename: filename.clone(),
                    error: e.to_string(),
                });
                UploadOutcome::Failure(FailureReason::from(&e))
            }
        }
    }

    /// Cancel the in-flight upload, if any
    pub fn abort(&self) {
        if self.is_uploading() {
            info!("Aborting in-flight upload");
            self.abort.notify_waiters();
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> UploadStatus {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn run_protocol(
        &self,
        request: UploadRequest,
        protocol: UploadProtocol,
    ) -> ClientResult<UploadReceipt> {
        let filename = request.filename().to_string();

        match protocol {
            UploadProtocol::Direct => {
                self.set_status(UploadStatus::Uploading { filename });
                let accepted = self.api.upload_direct(request).await?;

                Ok(UploadReceipt {
                    protocol,
                    job_id: accepted.job_id,
                    object_name: accepted.object_name,
                })
            }
            UploadProtocol::Presigned => {
                self.set_status(UploadStatus::Authorizing {
                    filename: filename.clone(),
                });
                let session = self.api.request_presigned_url(&request).await?;

                let receipt = UploadReceipt {
                    protocol,
                    job_id: session.job_id.clone(),
                    object_name: session.object_name.clone(),
                };

                self.set_status(UploadStatus::Transferring { filename });
                self.api.transfer_presigned(session, request.into_payload()).await?;

                Ok(receipt)
            }
        }
    }

    fn set_status(&self, status: UploadStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        } else {
            warn!("Failed to lock upload status for update");
        }
    }
}
