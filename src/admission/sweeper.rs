//! Background eviction of expired counting windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::limiter::Limiter;

/// Periodic reclamation task for one or more limiters' window stores.
///
/// The lazy replacement path in [`Limiter::check`] only fires when a key is
/// observed again; windows for keys that go cold would otherwise live
/// forever. The sweeper bounds memory by evicting every expired record on a
/// fixed interval, independent of request traffic.
pub struct Sweeper {
    /// Time between sweep ticks.
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawn the sweep loop over `limiters` on the current tokio runtime.
    ///
    /// Each tick sweeps every registered limiter; eviction goes through the
    /// same locks as the admission path, so it never races a concurrent
    /// `check` on the same key.
    pub fn spawn(self, limiters: Vec<Arc<Limiter>>) -> SweeperHandle {
        let shutdown = Arc::new(Notify::new());
        let stop = shutdown.clone();

        info!(
            interval_ms = self.interval.as_millis() as u64,
            stores = limiters.len(),
            "Starting window sweeper"
        );

        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.interval);
            // The first tick fires immediately; there is nothing to evict
            // yet, so skip straight to the cadence.
            tick.tick().await;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        for limiter in &limiters {
                            let removed = limiter.sweep();
                            if removed > 0 {
                                debug!(removed = removed, "Evicted expired windows");
                            }
                        }
                    }
                    _ = stop.notified() => {
                        debug!("Window sweeper stopping");
                        break;
                    }
                }
            }
        });

        SweeperHandle { shutdown, task }
    }
}

/// Handle for stopping a running [`Sweeper`].
pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep loop and wait for the task to finish.
    ///
    /// There is no state to flush; this only exists so the enclosing
    /// process can terminate cleanly.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Policy;
    use crate::request::RequestMeta;

    fn request_from(ip: &str) -> RequestMeta {
        RequestMeta::new(format!("{}:80", ip).parse().unwrap(), "GET", "/")
    }

    #[tokio::test]
    async fn test_sweeper_evicts_cold_keys() {
        let limiter = Arc::new(Limiter::new(Policy::new(Duration::from_millis(20), 10)));
        limiter.check(&request_from("10.0.0.1"));
        limiter.check(&request_from("10.0.0.2"));
        assert_eq!(limiter.tracked_keys(), 2);

        let handle = Sweeper::new(Duration::from_millis(30)).spawn(vec![limiter.clone()]);

        // Both windows expire after 20ms; the first real tick lands at 30ms.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_keys(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_keeps_live_windows() {
        let limiter = Arc::new(Limiter::new(Policy::new(Duration::from_secs(3600), 10)));
        limiter.check(&request_from("10.0.0.1"));

        let handle = Sweeper::new(Duration::from_millis(10)).spawn(vec![limiter.clone()]);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(limiter.tracked_keys(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_shutdown_stops_task() {
        let limiter = Arc::new(Limiter::new(Policy::new(Duration::from_secs(1), 10)));
        let handle = Sweeper::new(Duration::from_millis(10)).spawn(vec![limiter]);

        // Returns only once the task has actually finished.
        handle.shutdown().await;
    }
}
