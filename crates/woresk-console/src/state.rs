//! Console state shared by every command

use crate::api_client::ApiClient;
use crate::auth::AuthService;
use crate::dashboard::TopBar;
use crate::guard::{GuardDecision, Route, RouteGuard};
use crate::poller::ActivityPoller;
use crate::push::PushChannel;
use crate::scheduler::PollSchedule;
use crate::session::{FileStorage, SessionStore};
use std::sync::Arc;
use tracing::debug;
use woresk_core::{Config, Error, Result};

/// Configuration, session and clients for one console run
#[derive(Debug, Clone)]
pub struct ConsoleState {
    /// Loaded configuration
    pub config: Config,
    /// Session shared by every component
    pub session: Arc<SessionStore>,
    /// API client authorized by `session`
    pub api: ApiClient,
    /// Gate in front of protected views
    pub guard: RouteGuard,
}

impl ConsoleState {
    /// State over the file-backed session named by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no session location can be determined or the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let storage = match &config.session.storage_path {
            Some(path) => FileStorage::new(path),
            None => FileStorage::default_location()?,
        };
        debug!(path = %storage.path().display(), "Using session file");
        Self::with_session(config, Arc::new(SessionStore::open(storage)))
    }

    /// State over an existing session
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_session(config: Config, session: Arc<SessionStore>) -> Result<Self> {
        let api = ApiClient::from_config(&config)?.with_session(Arc::clone(&session));
        let guard = RouteGuard::new(Arc::clone(&session));
        Ok(Self {
            config,
            session,
            api,
            guard,
        })
    }

    /// Authentication flows for this session
    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.api.clone(), Arc::clone(&self.session))
    }

    /// Refuse to enter `route` without a session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the guard redirects.
    pub fn require(&self, route: Route) -> Result<()> {
        match self.guard.check(route) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect(target) => Err(Error::Unauthorized(format!(
                "{route} requires a session; sign in at {target} with `woresk login`"
            ))),
        }
    }

    /// Polling schedule from the configuration
    #[must_use]
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule::from_config(&self.config.polling)
    }

    /// Activity poller over this session
    #[must_use]
    pub fn poller(&self) -> ActivityPoller {
        ActivityPoller::new(
            Arc::new(self.api.clone()),
            Arc::clone(&self.session),
            self.schedule(),
        )
    }

    /// Top bar with the badge from one immediate poll
    ///
    /// A failed poll shows no badge.
    pub async fn top_bar(&self) -> TopBar {
        let unseen = self.poller().poll_once().await.unwrap_or(0);
        TopBar::new(&self.session, unseen)
    }

    /// Mark all activity as seen and zero the badge, as the notification bell does
    ///
    /// Polls once first so the stored value also covers the newest entry the
    /// backend reports. Returns the stored `last_seen_activity`.
    pub async fn acknowledge_activity(&self) -> String {
        let poller = self.poller();
        poller.poll_once().await;
        poller.acknowledge()
    }

    /// Push channel, when enabled
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable socket URL.
    pub fn push_channel(&self) -> Result<Option<PushChannel>> {
        if !self.config.push.enabled {
            return Ok(None);
        }
        PushChannel::from_config(&self.config.push).map(Some)
    }
}
