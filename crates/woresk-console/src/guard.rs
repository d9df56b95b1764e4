//! Route guard for the console views
//!
//! A protected view renders only while the session holds a non-empty token.
//! The token is never validated against the server, so a revoked token keeps
//! passing until an API call comes back with [`woresk_core::Error::Unauthorized`].
//! Each check reloads the session, so a logout in another process closes
//! the guard here too.

use crate::session::SessionStore;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Console views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in form
    Login,
    /// Summary counters
    Dashboard,
    /// Activity log
    Alerts,
    /// User roles
    ManageUsers,
    /// Payment processors
    Processors,
    /// Super-admin accounts
    SuperAdmins,
}

impl Route {
    /// Every route, in menu order
    pub const ALL: [Self; 6] = [
        Self::Login,
        Self::Dashboard,
        Self::Alerts,
        Self::ManageUsers,
        Self::Processors,
        Self::SuperAdmins,
    ];

    /// URL path of the view
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Alerts => "/alerts",
            Self::ManageUsers => "/manage-users",
            Self::Processors => "/processors",
            Self::SuperAdmins => "/super-admins",
        }
    }

    /// Whether the view needs a session
    #[must_use]
    pub const fn is_protected(self) -> bool {
        !matches!(self, Self::Login)
    }

    /// Route for a path; `/` and anything unknown land on the login view
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|route| route.path() == trimmed)
            .unwrap_or(Self::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested view
    Allow,
    /// Render this view instead
    Redirect(Route),
}

/// Gate in front of every protected view
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    /// Guard backed by `session`
    #[must_use]
    pub const fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide whether `route` may render
    #[must_use]
    pub fn check(&self, route: Route) -> GuardDecision {
        if !route.is_protected() {
            return GuardDecision::Allow;
        }
        self.session.reload();
        if self.session.is_authenticated() {
            GuardDecision::Allow
        } else {
            debug!(%route, "No session token, redirecting to login");
            GuardDecision::Redirect(Route::Login)
        }
    }

    /// Resolve `path` and return the view that ends up rendering
    #[must_use]
    pub fn navigate(&self, path: &str) -> Route {
        let route = Route::resolve(path);
        match self.check(route) {
            GuardDecision::Allow => route,
            GuardDecision::Redirect(target) => target,
        }
    }
}
