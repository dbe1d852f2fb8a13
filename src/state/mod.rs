//! Application state management.
//!
//! This module contains the synchronizer lifecycle state and the manager
//! that composes uploads with feed refreshes.

mod app_state;
mod manager;

pub use app_state::SyncState;
pub use manager::AppStateManager;
