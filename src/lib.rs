pub mod api_client;
pub mod api_contracts;
pub mod commands;
pub mod config_utils;
pub mod errors;
pub mod feed_sync;
pub mod logging;
pub mod state;
pub mod types;
pub mod upload_coordinator;

#[cfg(test)]
mod test_harness;

pub use api_client::ApiClient;
pub use config_utils::{ClientConfig, LogConfig};
pub use errors::{ClientError, ClientResult, ErrorKind};
pub use feed_sync::{FeedSource, FeedSynchronizer, SyncConfig, SyncStats};
pub use state::{AppStateManager, SyncState};
pub use types::{
    FailureReason, FeedSnapshot, ImageRef, UploadOutcome, UploadProtocol, UploadReceipt, UploadRequest,
};
pub use upload_coordinator::{UploadCoordinator, UploadStatus};

use clap::Parser;
use commands::Cli;
use std::process::ExitCode;
use tracing::{error, info};

/// Entry point for the `image-feed-uploader` binary
pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::load() {
        Ok(config) => cli.apply_to(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    // Keep the file writer alive until exit
    let _log_guard = match logging::init_logging(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_base_url,
        "Image feed uploader starting"
    );

    match commands::dispatch(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!(kind = ?e.kind(), "{}", e);
            ExitCode::FAILURE
        }
    }
}
