//! Recurring poll timer for a running session.
//!
//! The timer task never touches session state. It only signals ticks over a
//! channel with room for one pending tick, so a slow owner sees skipped ticks
//! rather than a backlog.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

/// One firing of the poll timer, stamped with the session it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Stops the timer behind a [`PollHandle`]. Clones share the same timer.
#[derive(Debug, Clone)]
pub struct PollCancel {
    tx: Arc<watch::Sender<bool>>,
}

impl PollCancel {
    /// Stop the timer. Returns true only for the call that actually stopped it.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Owned handle to a session's poll timer.
///
/// Dropping the handle stops the timer.
#[derive(Debug)]
pub struct PollHandle {
    ticks: mpsc::Receiver<Tick>,
    cancel: PollCancel,
    generation: u64,
}

impl PollHandle {
    /// Spawn a timer that fires every `period`, starting one period from now.
    pub(crate) fn spawn(period: Duration, generation: u64) -> Self {
        let (tick_tx, ticks) = mpsc::channel(1);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    result = cancel_rx.changed() => {
                        if result.is_err() || *cancel_rx.borrow() {
                            return;
                        }
                    }
                    _ = interval.tick() => {
                        match tick_tx.try_send(Tick { generation }) {
                            // Full: the owner is still busy with the previous tick.
                            Ok(()) | Err(TrySendError::Full(_)) => {}
                            Err(TrySendError::Closed(_)) => return,
                        }
                    }
                }
            }
        });

        Self {
            ticks,
            cancel: PollCancel {
                tx: Arc::new(cancel_tx),
            },
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next tick. Returns `None` once the timer is stopped.
    pub async fn next_tick(&mut self) -> Option<Tick> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let tick = self.ticks.recv().await?;
        (!self.cancel.is_cancelled()).then_some(tick)
    }

    /// Stop the timer. Safe to call any number of times.
    pub fn stop(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A second way to stop this timer, for whoever drives the session.
    pub fn canceller(&self) -> PollCancel {
        self.cancel.clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
