//! `config` command: show, and optionally persist, the effective settings.

use crate::config_utils::{save_config_file, ClientConfig, CONFIG_FILE_NAME};
use crate::errors::ClientResult;
use std::process::ExitCode;
use tracing::info;

pub fn show_config(config: &ClientConfig, save: bool) -> ClientResult<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = save_config_file(CONFIG_FILE_NAME, config)?;
        info!("Saved configuration to {:?}", path);
        println!("Saved to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
