//! Fixed-cadence cycle runner with a shutdown handle.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Stops a running `Scheduler` at its next wait
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // receivers may already be gone
        let _ = self.tx.send(true);
    }
}

pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(interval: Duration, max_cycles: Option<u64>) -> (Self, ShutdownHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                interval,
                max_cycles,
                shutdown: rx,
            },
            ShutdownHandle { tx },
        )
    }

    /// Run `cycle` now and then once per interval until shut down or
    /// `max_cycles` is reached. A cycle in flight is never interrupted.
    /// Returns how many cycles ran.
    pub async fn run<F, Fut>(mut self, mut cycle: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut completed = 0u64;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            cycle(completed + 1).await;
            completed += 1;

            if self.max_cycles.is_some_and(|max| completed >= max) {
                debug!("Reached {} cycles", completed);
                break;
            }

            info!("💤 Next cycle in {:?}", self.interval);
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = self.shutdown.changed() => {
                    // a dropped handle also ends the loop
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Scheduler stopped after {} cycles", completed);
        completed
    }
}
