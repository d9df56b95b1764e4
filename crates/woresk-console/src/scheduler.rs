//! Periodic background tasks with broadcast shutdown

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use woresk_core::config::PollingConfig;

/// How often a periodic task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    interval: Duration,
    jitter: Duration,
}

impl PollSchedule {
    /// Fixed period plus up to `jitter` of random delay per tick
    #[must_use]
    pub const fn new(interval: Duration, jitter: Duration) -> Self {
        Self { interval, jitter }
    }

    /// Schedule from the `polling` configuration section
    #[must_use]
    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.jitter())
    }

    /// Base period
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay before the next tick
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        self.interval + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

/// Run `tick` now and then once per scheduled delay until shutdown
///
/// A tick in flight when shutdown arrives is dropped, so nothing it would
/// have written lands after the task ends.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    schedule: PollSchedule,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                () = tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(schedule.next_delay()) => {}
            }
        }
        debug!(task = name, "Periodic task shutting down");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_next_delay_without_jitter() {
        let schedule = PollSchedule::new(Duration::from_secs(15), Duration::ZERO);
        assert_eq!(schedule.next_delay(), Duration::from_secs(15));
    }

    #[test]
    fn test_next_delay_with_jitter_stays_in_range() {
        let schedule = PollSchedule::new(Duration::from_secs(15), Duration::from_millis(500));
        for _ in 0..100 {
            let delay = schedule.next_delay();
            assert!(delay >= Duration::from_secs(15));
            assert!(delay <= Duration::from_millis(15_500));
        }
    }

    #[test]
    fn test_default_schedule_is_fifteen_seconds() {
        assert_eq!(PollSchedule::default().interval(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_on_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let schedule = PollSchedule::new(Duration::from_secs(15), Duration::ZERO);

        let counter = Arc::clone(&count);
        let handle = spawn_periodic("test", schedule, shutdown_rx, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_tick_in_flight() {
        let finished = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let schedule = PollSchedule::new(Duration::from_secs(15), Duration::ZERO);

        let done = Arc::clone(&finished);
        let handle = spawn_periodic("slow", schedule, shutdown_rx, move || {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
