//! Client-held session: the token and user metadata that survive restarts
//!
//! The store keeps every field in memory behind one lock and mirrors the
//! whole map to a [`SessionStorage`] backend after each write. Several
//! processes may share one backend: writes merge over the backend's current
//! contents, and [`SessionStore::reload`] picks up what other processes
//! wrote. Plain reads never touch the backend, and backend failures are
//! logged rather than returned, so every operation is total.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use woresk_core::types::LoginResponse;
use woresk_core::utils::MIN_TIMESTAMP;
use woresk_core::SessionKey;

/// Greeting shown when the login response carried none
pub const DEFAULT_WELCOME: &str = "Super Admin";

/// Persistent key-value medium behind the session
pub trait SessionStorage: Send + Sync + fmt::Debug {
    /// Read everything previously persisted
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the medium exists but cannot be read.
    fn load(&self) -> std::io::Result<BTreeMap<String, String>>;

    /// Replace the persisted contents with `entries`
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the medium cannot be written.
    fn persist(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()>;
}

/// Storage that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `entries`, as if a previous run had written them
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// What the last persist wrote
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> std::io::Result<BTreeMap<String, String>> {
        Ok(self.entries.read().clone())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        *self.entries.write() = entries.clone();
        Ok(())
    }
}

/// JSON file storage, written atomically through a sibling temp file
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage in the platform data directory
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no home directory can be found.
    pub fn default_location() -> woresk_core::Result<Self> {
        directories::ProjectDirs::from("com", "woresk", "woresk-admin")
            .map(|dirs| Self::new(dirs.data_dir().join("session.json")))
            .ok_or_else(|| {
                woresk_core::Error::configuration(
                    "cannot determine a data directory; set session.storage_path",
                )
            })
    }

    /// Backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> std::io::Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).map_err(std::io::Error::other),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(entries).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, body)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)
    }
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fresh store, never signed in
    Init,
    /// A token is held
    Authenticated,
    /// Explicitly cleared (logout)
    Cleared,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Cleared => write!(f, "cleared"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    entries: BTreeMap<String, String>,
    state: SessionState,
    // last persist failed; the backend is behind the in-memory view
    dirty: bool,
}

/// Session context shared by reference with every component that needs it
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<Inner>,
    storage: Box<dyn SessionStorage>,
}

fn has_token(entries: &BTreeMap<String, String>) -> bool {
    entries
        .get(SessionKey::AccessToken.as_str())
        .is_some_and(|t| !t.is_empty())
}

impl SessionStore {
    /// Open a session over `storage`, picking up anything it already holds
    pub fn open(storage: impl SessionStorage + 'static) -> Self {
        let entries = storage.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored session, starting empty");
            BTreeMap::new()
        });

        let state = if has_token(&entries) {
            SessionState::Authenticated
        } else {
            SessionState::Init
        };
        debug!(%state, keys = entries.len(), "Session opened");

        Self {
            inner: RwLock::new(Inner {
                entries,
                state,
                dirty: false,
            }),
            storage: Box::new(storage),
        }
    }

    /// In-memory session, for tests and one-shot tools
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MemoryStorage::new())
    }

    fn persist(&self, inner: &mut Inner) {
        match self.storage.persist(&inner.entries) {
            Ok(()) => inner.dirty = false,
            Err(e) => {
                warn!(error = %e, "Failed to persist session");
                inner.dirty = true;
            }
        }
    }

    fn sync_from_storage(&self, inner: &mut Inner) {
        if inner.dirty {
            self.persist(inner);
            return;
        }
        match self.storage.load() {
            Ok(entries) => {
                if entries != inner.entries {
                    debug!(keys = entries.len(), "Session changed in storage");
                    inner.entries = entries;
                    Self::refresh_state(inner);
                }
            }
            Err(e) => warn!(error = %e, "Failed to reload session, keeping current view"),
        }
    }

    /// Pick up changes another process wrote to the backend
    ///
    /// A logout elsewhere leaves this store [`SessionState::Cleared`]. While a
    /// local write has not reached the backend, the local view wins and the
    /// write is retried instead.
    pub fn reload(&self) {
        let mut inner = self.inner.write();
        self.sync_from_storage(&mut inner);
    }

    fn refresh_state(inner: &mut Inner) {
        if has_token(&inner.entries) {
            inner.state = SessionState::Authenticated;
        } else if inner.state == SessionState::Authenticated {
            inner.state = SessionState::Cleared;
        }
    }

    /// Read one field
    #[must_use]
    pub fn get(&self, key: SessionKey) -> Option<String> {
        self.inner.read().entries.get(key.as_str()).cloned()
    }

    /// Write one field
    pub fn set(&self, key: SessionKey, value: impl Into<String>) {
        let mut inner = self.inner.write();
        self.sync_from_storage(&mut inner);
        inner.entries.insert(key.as_str().to_string(), value.into());
        Self::refresh_state(&mut inner);
        self.persist(&mut inner);
    }

    /// Drop one field
    pub fn remove(&self, key: SessionKey) {
        let mut inner = self.inner.write();
        self.sync_from_storage(&mut inner);
        if inner.entries.remove(key.as_str()).is_some() {
            Self::refresh_state(&mut inner);
            self.persist(&mut inner);
        }
    }

    /// Remove every field in one step
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.state = SessionState::Cleared;
        self.persist(&mut inner);
        debug!("Session cleared");
    }

    /// Every field as of one instant
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.read().entries.clone()
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Record a successful login; all five fields land under one lock
    pub fn store_login(&self, login: &LoginResponse) {
        let mut inner = self.inner.write();
        self.sync_from_storage(&mut inner);
        for (key, value) in [
            (SessionKey::AccessToken, &login.access_token),
            (SessionKey::TokenType, &login.token_type),
            (SessionKey::Username, &login.username),
            (SessionKey::WelcomeMessage, &login.message),
            (SessionKey::Role, &login.role),
        ] {
            inner.entries.insert(key.as_str().to_string(), value.clone());
        }
        Self::refresh_state(&mut inner);
        self.persist(&mut inner);
    }

    /// The token, when present and non-empty
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.get(SessionKey::AccessToken).filter(|t| !t.is_empty())
    }

    /// Whether a non-empty token is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        has_token(&self.inner.read().entries)
    }

    /// `Authorization` header value, e.g. `bearer abc`
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        let inner = self.inner.read();
        let token = inner
            .entries
            .get(SessionKey::AccessToken.as_str())
            .filter(|t| !t.is_empty())?;
        let scheme = inner
            .entries
            .get(SessionKey::TokenType.as_str())
            .filter(|t| !t.is_empty())
            .map_or("Bearer", String::as_str);
        Some(format!("{scheme} {token}"))
    }

    /// Signed-in username, empty when signed out
    #[must_use]
    pub fn username(&self) -> String {
        self.get(SessionKey::Username).unwrap_or_default()
    }

    /// Role of the signed-in account
    #[must_use]
    pub fn role(&self) -> Option<String> {
        self.get(SessionKey::Role)
    }

    /// Banner text for the top bar
    #[must_use]
    pub fn welcome_message(&self) -> String {
        self.get(SessionKey::WelcomeMessage)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_WELCOME.to_string())
    }

    /// Newest acknowledged activity timestamp, or the epoch
    #[must_use]
    pub fn last_seen_activity(&self) -> String {
        self.get(SessionKey::LastSeenActivity)
            .unwrap_or_else(|| MIN_TIMESTAMP.to_string())
    }

    /// Acknowledge activity up to `timestamp`
    pub fn set_last_seen_activity(&self, timestamp: impl Into<String>) {
        self.set(SessionKey::LastSeenActivity, timestamp);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn login() -> LoginResponse {
        LoginResponse {
            access_token: "tok-123".to_string(),
            token_type: "bearer".to_string(),
            username: "admin".to_string(),
            message: "Welcome back, admin".to_string(),
            role: "SUPER_ADMIN".to_string(),
        }
    }

    #[test]
    fn test_fresh_store_is_init() {
        let store = SessionStore::in_memory();
        assert_eq!(store.state(), SessionState::Init);
        assert!(!store.is_authenticated());
        assert_eq!(store.welcome_message(), DEFAULT_WELCOME);
        assert_eq!(store.last_seen_activity(), MIN_TIMESTAMP);
    }

    #[test]
    fn test_store_login_sets_all_fields() {
        let store = SessionStore::in_memory();
        store.store_login(&login());

        assert_eq!(store.state(), SessionState::Authenticated);
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert_eq!(store.get(SessionKey::TokenType).as_deref(), Some("bearer"));
        assert_eq!(store.username(), "admin");
        assert_eq!(store.welcome_message(), "Welcome back, admin");
        assert_eq!(store.role().as_deref(), Some("SUPER_ADMIN"));
        assert_eq!(store.authorization().as_deref(), Some("bearer tok-123"));
    }

    #[test]
    fn test_clear_removes_every_field() {
        let store = SessionStore::in_memory();
        store.store_login(&login());
        store.set_last_seen_activity("2024-01-01T00:00:00Z");

        store.clear();

        for key in SessionKey::ALL {
            assert_eq!(store.get(key), None, "{key} survived clear()");
        }
        assert_eq!(store.state(), SessionState::Cleared);
        assert!(store.authorization().is_none());
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let store = SessionStore::in_memory();
        store.set(SessionKey::AccessToken, "");
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());
        assert_eq!(store.state(), SessionState::Init);
    }

    #[test]
    fn test_removing_token_moves_to_cleared() {
        let store = SessionStore::in_memory();
        store.store_login(&login());
        store.remove(SessionKey::AccessToken);
        assert_eq!(store.state(), SessionState::Cleared);
    }

    #[test]
    fn test_open_picks_up_persisted_token() {
        let storage = MemoryStorage::with_entries([("access_token", "persisted")]);
        let store = SessionStore::open(storage);
        assert_eq!(store.state(), SessionState::Authenticated);
        assert_eq!(store.token().as_deref(), Some("persisted"));
        assert_eq!(store.authorization().as_deref(), Some("Bearer persisted"));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let store = SessionStore::open(FileStorage::new(&path));
            store.store_login(&login());
            store.set_last_seen_activity("2024-02-02T00:00:00Z");
        }

        let reopened = SessionStore::open(FileStorage::new(&path));
        assert_eq!(reopened.state(), SessionState::Authenticated);
        assert_eq!(reopened.username(), "admin");
        assert_eq!(reopened.last_seen_activity(), "2024-02-02T00:00:00Z");

        reopened.clear();
        let after_clear = SessionStore::open(FileStorage::new(&path));
        assert!(!after_clear.is_authenticated());
        assert_eq!(after_clear.get(SessionKey::Username), None);
    }

    #[test]
    fn test_reload_sees_other_process_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let watcher = SessionStore::open(FileStorage::new(&path));
        let other = SessionStore::open(FileStorage::new(&path));

        other.store_login(&login());
        assert!(!watcher.is_authenticated());
        watcher.reload();
        assert_eq!(watcher.state(), SessionState::Authenticated);
        assert_eq!(watcher.username(), "admin");

        other.set_last_seen_activity("2024-01-02T00:00:00Z");
        watcher.reload();
        assert_eq!(watcher.last_seen_activity(), "2024-01-02T00:00:00Z");

        other.clear();
        watcher.reload();
        assert!(!watcher.is_authenticated());
        assert_eq!(watcher.state(), SessionState::Cleared);
    }

    #[test]
    fn test_write_merges_over_other_process_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let first = SessionStore::open(FileStorage::new(&path));
        let second = SessionStore::open(FileStorage::new(&path));

        first.store_login(&login());
        second.set_last_seen_activity("2024-01-02T00:00:00Z");

        let reopened = SessionStore::open(FileStorage::new(&path));
        assert_eq!(reopened.token().as_deref(), Some("tok-123"));
        assert_eq!(reopened.last_seen_activity(), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_reload_keeps_unpersisted_writes() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be makes every persist fail
        let path = dir.path().join("session.json");
        std::fs::create_dir(&path).unwrap();

        let store = SessionStore::open(FileStorage::new(&path));
        store.store_login(&login());
        store.reload();
        assert_eq!(store.token().as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(FileStorage::new(&path));
        assert_eq!(store.state(), SessionState::Init);
    }

    #[test]
    fn test_clear_is_never_observed_half_done() {
        let store = Arc::new(SessionStore::in_memory());
        store.store_login(&login());

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let fields = store.snapshot();
                    assert!(fields.is_empty() || fields.len() == 5, "partial session: {fields:?}");
                }
            })
        };

        for _ in 0..1_000 {
            store.clear();
            store.store_login(&login());
        }
        reader.join().unwrap();
    }
}
