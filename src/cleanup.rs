//! Background sweep of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{Event, EventSender};
use crate::metrics;
use crate::store::SessionStore;

/// Owns the sweep task. Dropping the scheduler without calling [`stop`]
/// leaves the task running until the runtime shuts down.
///
/// [`stop`]: CleanupScheduler::stop
pub struct CleanupScheduler {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl CleanupScheduler {
    /// Spawns the sweep loop. The first sweep runs after one full interval.
    pub fn start(store: Arc<SessionStore>, events: EventSender, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; consume it so sweeps start
            // one interval in.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired(Utc::now());
                        if removed > 0 {
                            metrics::SESSIONS_SWEPT.inc_by(removed as u64);
                            events.send(Event::SessionsSwept { removed }).await;
                            info!(removed, "swept expired payment sessions");
                        } else {
                            debug!("sweep found no expired sessions");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("cleanup scheduler stopped");
        });
        Self { handle, shutdown }
    }

    /// Signals the loop and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!("cleanup task did not shut down cleanly: {}", e);
        }
    }
}
