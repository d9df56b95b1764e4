//! Headless admin console for the woresk payments backend
//!
//! The console keeps a persistent session, gates protected views behind it,
//! mirrors the backend's user, processor, super-admin and activity
//! collections, polls the activity log for the notification badge and
//! listens on the processor push channel.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod api_client;
pub mod auth;
pub mod dashboard;
pub mod guard;
pub mod panels;
pub mod poller;
pub mod push;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use api_client::ApiClient;
pub use auth::AuthService;
pub use dashboard::{DashboardStats, TopBar};
pub use guard::{GuardDecision, Route, RouteGuard};
pub use panels::{Editable, Panel, Resource};
pub use poller::{ActivityFeed, ActivityPoller};
pub use push::PushChannel;
pub use scheduler::PollSchedule;
pub use session::{FileStorage, MemoryStorage, SessionState, SessionStorage, SessionStore};
pub use state::ConsoleState;

/// Build console state from configuration loaded off disk and the environment
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the session cannot be
/// located.
pub fn init(config_path: Option<&std::path::Path>) -> woresk_core::Result<ConsoleState> {
    let config = woresk_core::Config::load_from(config_path)?;
    ConsoleState::new(config)
}
