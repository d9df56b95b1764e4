//! Activity log panel (`/activity_logs`)
//!
//! Opening the panel acknowledges everything it fetched. Clearing the log
//! acknowledges up to now, so a poll that lands right after still reports
//! nothing unseen.

use super::{Panel, Resource};
use crate::api_client::ApiClient;
use crate::session::SessionStore;
use tracing::info;
use woresk_core::ActivityEvent;
use woresk_core::Result;
use woresk_core::utils::{later_of, newest, now_timestamp};

impl Resource for ActivityEvent {
    type Id = i64;
    const COLLECTION: &'static str = "activity_logs";
    const LABEL: &'static str = "activity log entry";

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Panel listing activity log entries
pub type AlertsPanel = Panel<ActivityEvent>;

impl Panel<ActivityEvent> {
    /// Fetch the log and mark every fetched entry as seen
    ///
    /// Returns the stored `last_seen_activity`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; nothing is acknowledged in that case.
    pub async fn open(&mut self, api: &ApiClient, session: &SessionStore) -> Result<String> {
        self.refresh(api).await?;
        Ok(self.acknowledge_fetched(session))
    }

    /// Store the newest fetched timestamp as `last_seen_activity`
    ///
    /// Never moves the stored value backwards.
    pub fn acknowledge_fetched(&self, session: &SessionStore) -> String {
        session.reload();
        let current = session.last_seen_activity();
        let seen = newest(self.rows().iter().map(|e| e.timestamp.as_str()))
            .map_or_else(|| current.clone(), |latest| later_of(&current, latest).to_string());

        if seen != current {
            session.set_last_seen_activity(seen.clone());
        }
        seen
    }

    /// Delete every entry, then acknowledge up to now
    ///
    /// # Errors
    ///
    /// Returns the API error; the list and the session are left alone.
    pub async fn delete_all(&mut self, api: &ApiClient, session: &SessionStore) -> Result<()> {
        let result = api.clear_activity_logs().await;
        self.track(result)?;

        self.clear_local();
        session.reload();
        let now = now_timestamp();
        let current = session.last_seen_activity();
        session.set_last_seen_activity(later_of(&now, &current).to_string());
        info!("Activity log cleared");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(id: i64, timestamp: &str) -> ActivityEvent {
        ActivityEvent {
            id,
            event: "login-success".to_string(),
            username: Some("admin".to_string()),
            ip_addr: "10.0.0.1".to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_acknowledge_fetched_stores_newest() {
        let session = SessionStore::in_memory();
        let mut panel = AlertsPanel::new();
        panel
            .apply_fetch(Ok(vec![
                entry(2, "2024-01-02T00:00:00Z"),
                entry(1, "2023-12-31T00:00:00Z"),
            ]))
            .unwrap();

        assert_eq!(panel.acknowledge_fetched(&session), "2024-01-02T00:00:00Z");
        assert_eq!(session.last_seen_activity(), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_acknowledge_never_moves_backwards() {
        let session = SessionStore::in_memory();
        session.set_last_seen_activity("2025-06-01T00:00:00Z");
        let mut panel = AlertsPanel::new();
        panel
            .apply_fetch(Ok(vec![entry(1, "2024-01-02T00:00:00Z")]))
            .unwrap();

        assert_eq!(panel.acknowledge_fetched(&session), "2025-06-01T00:00:00Z");
    }

    #[test]
    fn test_acknowledge_empty_list_keeps_value() {
        let session = SessionStore::in_memory();
        let panel = AlertsPanel::new();
        assert_eq!(
            panel.acknowledge_fetched(&session),
            woresk_core::utils::MIN_TIMESTAMP
        );
        assert!(session.get(woresk_core::SessionKey::LastSeenActivity).is_none());
    }
}
