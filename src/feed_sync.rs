//! Polling synchronizer for the resized-image feed.
//!
//! The backend never pushes updates, so this module keeps a local
//! [`FeedSnapshot`] approximately fresh by polling:
//! - One immediate poll on start, then a fixed cadence (3s by default)
//! - Out-of-cadence refreshes on demand, coalesced while one is in flight
//! - Failed polls keep the previous snapshot and are only logged
//! - Results landing after `stop()` are discarded
//!
//! ## Usage
//! ```rust,ignore
//! let sync = FeedSynchronizer::new(Arc::new(api_client), SyncConfig::default());
//! sync.start();
//! let mut feed = sync.subscribe();
//! feed.changed().await?;
//! sync.stop();
//! ```

use crate::errors::ClientResult;
use crate::state::SyncState;
use crate::types::{FeedSnapshot, ImageRef};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Authoritative list of processed images, as seen by the poller
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    async fn list_feed(&self) -> ClientResult<Vec<ImageRef>>;
}

/// Configuration for the feed synchronizer
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between scheduled polls (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
        }
    }
}

/// Stats about polling for debugging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub polls_started: u64,
    pub polls_applied: u64,
    pub polls_failed: u64,
    /// Successful polls dropped because they were stale or arrived after stop()
    pub polls_discarded: u64,
}

/// State shared between the synchronizer and its spawned tasks
struct SyncShared {
    snapshot: watch::Sender<Arc<FeedSnapshot>>,
    /// Bumped by stop(); polls started under an older generation never commit
    generation: AtomicU64,
    next_sequence: AtomicU64,
    refresh_in_flight: AtomicBool,
    refresh_again: AtomicBool,
    stats: Mutex<SyncStats>,
}

impl SyncShared {
    fn record<F: FnOnce(&mut SyncStats)>(&self, update: F) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    /// Replace the snapshot wholesale if this poll is still current.
    fn commit(&self, generation: u64, sequence: u64, images: Vec<ImageRef>) -> bool {
        let applied = self.snapshot.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation || sequence <= current.sequence {
                return false;
            }
            *current = Arc::new(FeedSnapshot {
                images,
                fetched_at: Some(Utc::now()),
                sequence,
            });
            true
        });

        self.record(|s| {
            if applied {
                s.polls_applied += 1;
            } else {
                s.polls_discarded += 1;
            }
        });
        applied
    }

    /// Invalidate every poll currently in flight.
    ///
    /// Bumped under the snapshot lock so a concurrent commit either lands
    /// before this returns or not at all.
    fn invalidate_in_flight(&self) {
        self.snapshot.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}

/// Keeps a locally cached, ordered view of the backend's feed
pub struct FeedSynchronizer {
    source: Arc<dyn FeedSource>,
    config: SyncConfig,
    shared: Arc<SyncShared>,
    /// Recurring poll task; `Some` while running
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSynchronizer {
    pub fn new(source: Arc<dyn FeedSource>, config: SyncConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(FeedSnapshot::default()));

        Self {
            source,
            config,
            shared: Arc::new(SyncShared {
                snapshot,
                generation: AtomicU64::new(0),
                next_sequence: AtomicU64::new(0),
                refresh_in_flight: AtomicBool::new(false),
                refresh_again: AtomicBool::new(false),
                stats: Mutex::new(SyncStats::default()),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Start polling: one poll now, then one every `poll_interval_ms`.
    ///
    /// Idempotent; a second call while running does not add a timer.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Feed synchronizer already running");
            return;
        }

        let generation = self.shared.generation.load(Ordering::SeqCst);
        let period = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let source = self.source.clone();
        let shared = self.shared.clone();

        info!(interval_ms = self.config.poll_interval_ms, "Starting feed synchronizer");

        *timer = Some(tokio::spawn(async move {
            // Phase is anchored at start(), not at the end of the first poll
            let first_tick = Instant::now() + period;
            poll_once(source.as_ref(), &shared, generation).await;

            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                poll_once(source.as_ref(), &shared, generation).await;
            }
        }));
    }

    /// Cancel the recurring poll. Safe to call when not started.
    pub fn stop(&self) {
        let handle = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            self.shared.invalidate_in_flight();
            info!("Feed synchronizer stopped");
        }
    }

    /// Poll once right away without shifting the recurring schedule.
    ///
    /// Triggers arriving while a manual refresh is in flight collapse into
    /// a single follow-up poll.
    pub fn refresh_now(&self) {
        if self.shared.refresh_in_flight.swap(true, Ordering::SeqCst) {
            self.shared.refresh_again.store(true, Ordering::SeqCst);
            debug!("Refresh already in flight, coalescing");
            return;
        }

        let source = self.source.clone();
        let shared = self.shared.clone();
        let mut generation = shared.generation.load(Ordering::SeqCst);

        tokio::spawn(async move {
            loop {
                poll_once(source.as_ref(), &shared, generation).await;

                if shared.refresh_again.swap(false, Ordering::SeqCst) {
                    generation = shared.generation.load(Ordering::SeqCst);
                    continue;
                }
                shared.refresh_in_flight.store(false, Ordering::SeqCst);

                // A trigger may have slipped in between the check and the release
                if shared.refresh_again.swap(false, Ordering::SeqCst)
                    && !shared.refresh_in_flight.swap(true, Ordering::SeqCst)
                {
                    generation = shared.generation.load(Ordering::SeqCst);
                    continue;
                }
                break;
            }
        });
    }

    pub fn state(&self) -> SyncState {
        let timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        match timer.as_ref() {
            Some(handle) if !handle.is_finished() => SyncState::Running,
            _ => SyncState::Stopped,
        }
    }

    /// The most recently committed snapshot
    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.shared.snapshot.borrow().clone()
    }

    /// Receive every committed snapshot replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Drop for FeedSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fetch the feed once and commit it if still current.
///
/// Failures leave the held snapshot untouched.
async fn poll_once(source: &dyn FeedSource, shared: &SyncShared, generation: u64) {
    let sequence = shared.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
    shared.record(|s| s.polls_started += 1);

    match source.list_feed().await {
        Ok(images) => {
            let count = images.len();
            if shared.commit(generation, sequence, images) {
                debug!(sequence, count, "Feed snapshot replaced");
            } else {
                debug!(sequence, "Discarding stale feed poll");
            }
        }
        Err(e) => {
            shared.record(|s| s.polls_failed += 1);
            warn!(sequence, error = %e, "Feed poll failed, keeping previous snapshot");
        }
    }
}
