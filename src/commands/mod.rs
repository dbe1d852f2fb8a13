//! Command-line shell.
//!
//! Each subcommand lives in its own submodule and receives the shared
//! [`AppStateManager`]; the shell itself only parses arguments and maps
//! results to an exit code.

pub mod feed;
pub mod jobs;
pub mod settings;
pub mod upload;

use crate::config_utils::ClientConfig;
use crate::errors::ClientResult;
use crate::state::AppStateManager;
use crate::types::UploadProtocol;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "image-feed-uploader")]
#[command(about = "Upload images for resizing and follow the resized feed")]
#[command(version)]
#[command(
    after_help = "Environment:\n  IMAGE_FEED_API_HOST   Backend base URL override\n  RUST_LOG              Log filter override"
)]
pub struct Cli {
    /// Backend base URL (overrides config file and environment)
    #[arg(long, global = true)]
    pub api_host: Option<String>,
    /// Poll interval for the feed, in milliseconds
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,
    /// Also write logs to ~/.image-feed-uploader/logs
    #[arg(long, global = true, default_value_t = false)]
    pub log_file: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload one image, then print the refreshed feed
    Upload {
        path: PathBuf,
        #[arg(long, default_value_t = UploadProtocol::Direct)]
        protocol: UploadProtocol,
    },
    /// Poll the feed and print every change
    Watch {
        /// Exit after the first snapshot
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Download one resized image
    Fetch { id: String, out: PathBuf },
    /// Show the processing status of an upload job
    Job { job_id: String },
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_to(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(host) = &self.api_host {
            config.api_base_url = host.clone();
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if self.log_file {
            config.log.file = true;
        }
        config
    }
}

pub async fn dispatch(command: Command, config: &ClientConfig) -> ClientResult<ExitCode> {
    let state = || AppStateManager::new(config);
    match command {
        Command::Upload { path, protocol } => upload::upload_file(&state(), &path, protocol).await,
        Command::Watch { once } => feed::watch(&state(), once).await,
        Command::Fetch { id, out } => feed::fetch(&state(), &id, &out).await,
        Command::Job { job_id } => jobs::show_job(&state(), &job_id).await,
        Command::Config { save } => settings::show_config(config, save),
    }
}
