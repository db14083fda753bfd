//! Cancellable background tasks.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A spawned task that is aborted when the guard is dropped.
#[derive(Debug)]
pub struct TaskGuard {
    handle: JoinHandle<()>,
}

impl TaskGuard {
    #[must_use]
    pub const fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Shortest interval a poller accepts; shorter ones are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs a fallible tick on a fixed interval until dropped.
///
/// The first tick fires one full interval after spawning; callers load
/// their initial state themselves. Tick errors are logged and swallowed so
/// one failed poll never stops the loop.
#[derive(Debug)]
pub struct Poller {
    name: &'static str,
    task: TaskGuard,
}

impl Poller {
    /// Spawn a poller on the current tokio runtime.
    #[must_use]
    pub fn spawn<F, Fut, E>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send,
        E: Display,
    {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(poller = name, ?interval, "poll interval too short, using minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; skip that one.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = tick().await {
                    tracing::warn!(poller = name, error = %e, "poll failed");
                }
            }
        });
        tracing::debug!(poller = name, ?interval, "poller started");

        Self {
            name,
            task: TaskGuard::new(handle),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling. Equivalent to dropping the poller.
    pub fn stop(self) {
        tracing::debug!(poller = self.name, "poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poller_ticks_after_interval_and_survives_errors() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let poller = Poller::spawn("test", Duration::from_secs(15), move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 { Err("boom") } else { Ok(()) }
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_poller_stops_ticks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let poller = Poller::spawn("test", Duration::from_secs(5), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        });

        tokio::time::sleep(Duration::from_secs(6)).await;
        poller.stop();
        let seen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let poller = Poller::spawn("zero", Duration::ZERO, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(poller.is_running());
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
