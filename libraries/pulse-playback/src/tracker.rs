//! Periodic position polling
//!
//! One loop lives as long as the controller. It sleeps on an activity
//! flag while no handle is attached and ticks at a fixed period while one
//! is, so nothing spins when there is nothing to poll.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Switch for the polling loop
#[derive(Debug)]
pub struct ProgressTracker {
    active: watch::Sender<bool>,
    period: Duration,
}

impl ProgressTracker {
    /// Create an inactive tracker polling every `period`
    pub fn new(period: Duration) -> Self {
        let (active, _) = watch::channel(false);
        Self { active, period }
    }

    /// Start (or restart) polling
    pub fn start(&self) {
        self.active.send_replace(true);
    }

    /// Stop polling
    pub fn stop(&self) {
        self.active.send_replace(false);
    }

    /// Whether polling is on
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Polling period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the polling loop; `poll` runs once per tick while active
    pub fn spawn<F, Fut>(&self, poll: F, cancel: CancellationToken) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let active = self.active.subscribe();
        let period = self.period;
        tokio::spawn(run_tracker(active, period, poll, cancel))
    }
}

async fn run_tracker<F, Fut>(
    mut active: watch::Receiver<bool>,
    period: Duration,
    poll: F,
    cancel: CancellationToken,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        // Idle until switched on
        while !*active.borrow_and_update() {
            tokio::select! {
                () = cancel.cancelled() => return,
                changed = active.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        debug!("Progress polling started ({:?})", period);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => poll().await,
                changed = active.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*active.borrow_and_update() {
                        debug!("Progress polling stopped");
                        break;
                    }
                    // Restarted while running: realign the ticker
                    ticker.reset();
                }
            }
        }
    }
}
