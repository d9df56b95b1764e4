//! Activity poller behind the notification badge
//!
//! Every tick fetches the full activity log and publishes how many entries
//! are newer than the session's `last_seen_activity`. Failed fetches are
//! swallowed and leave the previous count in place.
//!
//! Publishing and [`ActivityPoller::acknowledge`] both run under the same
//! lock, and the poller reads `last_seen_activity` only after its fetch
//! returns, so an acknowledgement is never overwritten by a count computed
//! against the old value. The session is reloaded first, which makes an
//! acknowledgement written by another process count as well.

use crate::api_client::ApiClient;
use crate::scheduler::{PollSchedule, spawn_periodic};
use crate::session::SessionStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use woresk_core::utils::{count_newer, later_of, newest, now_timestamp};
use woresk_core::{ActivityEvent, Result};

/// Source of activity log entries
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Fetch the full activity log
    async fn fetch_activity(&self) -> Result<Vec<ActivityEvent>>;
}

#[async_trait]
impl ActivityFeed for ApiClient {
    async fn fetch_activity(&self) -> Result<Vec<ActivityEvent>> {
        self.activity_logs().await
    }
}

#[derive(Debug, Default)]
struct PollState {
    newest_fetched: Option<String>,
}

struct PollerCore {
    feed: Arc<dyn ActivityFeed>,
    session: Arc<SessionStore>,
    badge_tx: watch::Sender<usize>,
    state: Mutex<PollState>,
}

impl PollerCore {
    async fn poll(&self) -> Option<usize> {
        let events = match self.feed.fetch_activity().await {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "Activity poll failed, keeping previous count");
                return None;
            }
        };

        let mut state = self.state.lock();
        self.session.reload();
        let last_seen = self.session.last_seen_activity();
        let unseen = count_newer(events.iter().map(|e| e.timestamp.as_str()), &last_seen);

        if let Some(latest) = newest(events.iter().map(|e| e.timestamp.as_str())) {
            let merged = state
                .newest_fetched
                .as_deref()
                .map_or(latest, |prev| later_of(prev, latest))
                .to_string();
            state.newest_fetched = Some(merged);
        }

        self.badge_tx.send_replace(unseen);
        drop(state);

        trace!(events = events.len(), unseen, "Activity poll complete");
        Some(unseen)
    }

    fn acknowledge(&self) -> String {
        let state = self.state.lock();
        self.session.reload();
        let now = now_timestamp();
        let current = self.session.last_seen_activity();

        let mut seen = later_of(&now, &current).to_string();
        if let Some(fetched) = state.newest_fetched.as_deref() {
            seen = later_of(&seen, fetched).to_string();
        }

        self.session.set_last_seen_activity(seen.clone());
        self.badge_tx.send_replace(0);
        drop(state);

        debug!(last_seen = %seen, "Activity acknowledged");
        seen
    }
}

/// Background task that keeps the unseen-activity badge current
pub struct ActivityPoller {
    core: Arc<PollerCore>,
    schedule: PollSchedule,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ActivityPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityPoller")
            .field("schedule", &self.schedule)
            .field("unseen", &self.unseen())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ActivityPoller {
    /// Poller over `feed`, comparing against `session`
    #[must_use]
    pub fn new(
        feed: Arc<dyn ActivityFeed>,
        session: Arc<SessionStore>,
        schedule: PollSchedule,
    ) -> Self {
        let (badge_tx, _) = watch::channel(0);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            core: Arc::new(PollerCore {
                feed,
                session,
                badge_tx,
                state: Mutex::new(PollState::default()),
            }),
            schedule,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Receiver that sees every published badge count
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.core.badge_tx.subscribe()
    }

    /// Current badge count
    #[must_use]
    pub fn unseen(&self) -> usize {
        *self.core.badge_tx.borrow()
    }

    /// Whether the background task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one poll now
    ///
    /// Returns the published count, or `None` when the fetch failed.
    pub async fn poll_once(&self) -> Option<usize> {
        self.core.poll().await
    }

    /// Mark everything fetched so far as seen and zero the badge
    ///
    /// Stores the later of now and the newest fetched timestamp, and returns
    /// the stored value.
    pub fn acknowledge(&self) -> String {
        self.core.acknowledge()
    }

    /// Spawn the polling task; the first poll runs immediately
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        info!(interval = ?self.schedule.interval(), "Starting activity poller");
        let core = Arc::clone(&self.core);
        *handle = Some(spawn_periodic(
            "activity-poller",
            self.schedule,
            self.shutdown_tx.subscribe(),
            move || {
                let core = Arc::clone(&core);
                async move {
                    core.poll().await;
                }
            },
        ));
    }

    /// Stop the polling task and wait for it to exit
    ///
    /// No count is published once this returns.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return;
        };

        let _ = self.shutdown_tx.send(());
        if let Err(e) = handle.await {
            debug!(error = %e, "Activity poller task ended abnormally");
        }
        info!("Activity poller stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::FileStorage;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use woresk_core::Error;

    #[derive(Default)]
    struct MockFeed {
        events: Mutex<Vec<ActivityEvent>>,
        failing: AtomicBool,
        delay: Mutex<Option<Duration>>,
        calls: AtomicUsize,
    }

    impl MockFeed {
        fn with_timestamps(timestamps: &[&str]) -> Arc<Self> {
            let feed = Self::default();
            feed.set_timestamps(timestamps);
            Arc::new(feed)
        }

        fn set_timestamps(&self, timestamps: &[&str]) {
            *self.events.lock() = timestamps
                .iter()
                .zip(1..)
                .map(|(ts, id)| ActivityEvent {
                    id,
                    event: "login-success".to_string(),
                    username: Some("admin".to_string()),
                    ip_addr: "127.0.0.1".to_string(),
                    timestamp: (*ts).to_string(),
                })
                .collect();
        }
    }

    #[async_trait]
    impl ActivityFeed for MockFeed {
        async fn fetch_activity(&self) -> Result<Vec<ActivityEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.events.lock().clone())
        }
    }

    fn poller(feed: Arc<MockFeed>, session: Arc<SessionStore>) -> ActivityPoller {
        ActivityPoller::new(
            feed,
            session,
            PollSchedule::new(Duration::from_secs(15), Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_counts_events_newer_than_last_seen() {
        let session = Arc::new(SessionStore::in_memory());
        session.set_last_seen_activity("2024-01-01T00:00:00Z");
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z", "2023-12-31T00:00:00Z"]);
        let poller = poller(feed, session);

        assert_eq!(poller.poll_once().await, Some(1));
        assert_eq!(poller.unseen(), 1);
    }

    #[tokio::test]
    async fn test_missing_last_seen_counts_everything() {
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z", "2023-12-31T00:00:00Z"]);
        let poller = poller(feed, Arc::new(SessionStore::in_memory()));
        assert_eq!(poller.poll_once().await, Some(2));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_count() {
        let session = Arc::new(SessionStore::in_memory());
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z"]);
        let poller = poller(Arc::clone(&feed), session);

        assert_eq!(poller.poll_once().await, Some(1));
        feed.failing.store(true, Ordering::SeqCst);
        assert_eq!(poller.poll_once().await, None);
        assert_eq!(poller.unseen(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_zeroes_badge_and_covers_fetched_events() {
        let session = Arc::new(SessionStore::in_memory());
        let future_ts = "2999-01-01T00:00:00.000Z";
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z", future_ts]);
        let poller = poller(feed, Arc::clone(&session));
        let mut badge = poller.subscribe();

        assert_eq!(poller.poll_once().await, Some(2));
        let seen = poller.acknowledge();

        assert_eq!(seen, future_ts);
        assert_eq!(session.last_seen_activity(), future_ts);
        assert_eq!(*badge.borrow_and_update(), 0);

        assert_eq!(poller.poll_once().await, Some(0));
    }

    #[tokio::test]
    async fn test_acknowledge_before_any_poll_uses_now() {
        let session = Arc::new(SessionStore::in_memory());
        let poller = poller(MockFeed::with_timestamps(&[]), Arc::clone(&session));

        let before = now_timestamp();
        let seen = poller.acknowledge();
        assert!(seen >= before);
        assert_eq!(poller.unseen(), 0);
    }

    #[tokio::test]
    async fn test_acknowledged_session_stays_zero_after_poll() {
        let session = Arc::new(SessionStore::in_memory());
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z", "2023-12-31T00:00:00Z"]);
        session.set_last_seen_activity(now_timestamp());
        let poller = poller(feed, session);

        assert_eq!(poller.poll_once().await, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_during_fetch_is_honoured() {
        let session = Arc::new(SessionStore::in_memory());
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z"]);
        *feed.delay.lock() = Some(Duration::from_secs(5));
        let poller = Arc::new(poller(feed, session));

        let in_flight = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.poll_once().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.acknowledge();

        assert_eq!(in_flight.await.unwrap(), Some(0));
        assert_eq!(poller.unseen(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polls_and_stop_halts() {
        let session = Arc::new(SessionStore::in_memory());
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z"]);
        let poller = poller(Arc::clone(&feed), session);

        poller.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(poller.is_running());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.unseen(), 1);

        feed.set_timestamps(&["2024-01-02T00:00:00Z", "2024-01-03T00:00:00Z"]);
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.unseen(), 2);

        poller.stop().await;
        assert!(!poller.is_running());

        feed.set_timestamps(&[]);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.unseen(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_stop_is_ignored() {
        let session = Arc::new(SessionStore::in_memory());
        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z"]);
        *feed.delay.lock() = Some(Duration::from_secs(5));
        let poller = poller(Arc::clone(&feed), session);

        poller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.stop().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.unseen(), 0);
    }

    #[tokio::test]
    async fn test_acknowledgement_from_other_process_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let watching = Arc::new(SessionStore::open(FileStorage::new(&path)));
        let elsewhere = SessionStore::open(FileStorage::new(&path));

        let feed = MockFeed::with_timestamps(&["2024-01-02T00:00:00Z", "2023-12-31T00:00:00Z"]);
        let poller = poller(feed, Arc::clone(&watching));
        assert_eq!(poller.poll_once().await, Some(2));

        elsewhere.set_last_seen_activity("2024-01-02T00:00:00Z");

        assert_eq!(poller.poll_once().await, Some(0));
        assert_eq!(watching.last_seen_activity(), "2024-01-02T00:00:00Z");
    }
}
