//! Dashboard counters and the top bar

use crate::api_client::ApiClient;
use crate::session::SessionStore;
use std::fmt;
use tracing::error;
use woresk_core::Processor;

/// Summary counters on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Managed users, from `/user_roles/user_count`
    pub user_count: u64,
    /// Configured processors
    pub processor_count: usize,
}

impl DashboardStats {
    /// Fetch both counters; a failed fetch is logged and shows as zero
    pub async fn load(api: &ApiClient) -> Self {
        let (users, processors) = tokio::join!(api.user_count(), api.list::<Processor>());

        let user_count = users.unwrap_or_else(|e| {
            error!(error = %e, "Error fetching user count");
            0
        });
        let processor_count = processors.map_or_else(
            |e| {
                error!(error = %e, "Error fetching processors");
                0
            },
            |rows| rows.len(),
        );

        Self {
            user_count,
            processor_count,
        }
    }
}

impl fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Users       {}", self.user_count)?;
        write!(f, "Processors  {}", self.processor_count)
    }
}

/// Header line: greeting plus the notification badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopBar {
    /// Welcome message from the login response
    pub welcome: String,
    /// Signed-in username
    pub username: String,
    /// Unseen activity count
    pub unseen: usize,
}

impl TopBar {
    /// Top bar for the current session
    #[must_use]
    pub fn new(session: &SessionStore, unseen: usize) -> Self {
        Self {
            welcome: session.welcome_message(),
            username: session.username(),
            unseen,
        }
    }
}

impl fmt::Display for TopBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.welcome)?;
        if !self.username.is_empty() {
            write!(f, " ({})", self.username)?;
        }
        if self.unseen > 0 {
            write!(f, "  [{} new]", self.unseen)?;
        }
        Ok(())
    }
}
