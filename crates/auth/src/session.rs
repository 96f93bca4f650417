//! Authentication session state machine.
//!
//! ```text
//!            login / check_saved_auth (record found)
//! Anonymous ───────────────────────────────────────▶ Authenticated
//!     ▲                                                   │
//!     └────────────────────── logout ─────────────────────┘
//! ```
//!
//! `login_failed` and `update_user_role` never change the state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use shell_core::{Clock, KeyValueStore, SystemClock};
use shell_events::EventBus;

use crate::error::SessionResult;
use crate::events::{AuthEvent, UserLoggedIn};
use crate::record::{AUTH_STORAGE_KEY, PersistedSession};
use crate::roles::Role;

/// Message stored by [`AuthSession::login_failed`] when the caller gives none.
pub const DEFAULT_LOGIN_ERROR: &str = "Authentication error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Anonymous,
    Authenticated,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    is_authenticated: bool,
    username: String,
    user_role: Role,
    last_login: Option<DateTime<Utc>>,
    login_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            username: String::new(),
            user_role: Role::none(),
            last_login: None,
            login_error: None,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Empty unless authenticated.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_role(&self) -> &Role {
        &self.user_role
    }

    /// Kept across logout; cleared only by the next login.
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn status(&self) -> AuthStatus {
        if self.is_authenticated {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        }
    }
}

/// The shell's authentication session.
///
/// State is mutated under a lock and events are published after the lock is
/// released, so subscribers can read the session they are being told about.
pub struct AuthSession {
    state: Mutex<SessionState>,
    bus: EventBus,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    storage_key: String,
}

impl AuthSession {
    pub fn new(bus: EventBus, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            bus,
            store,
            clock: Arc::new(SystemClock),
            storage_key: AUTH_STORAGE_KEY.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) -> SessionResult<()> {
        self.bus.publish(event.name(), event.payload())?;
        Ok(())
    }

    /// Mark the session authenticated as `username` with the default role.
    ///
    /// With `remember`, the login is written to storage so
    /// [`check_saved_auth`](Self::check_saved_auth) can restore it after a
    /// reload; without it, storage is left exactly as it was.
    ///
    /// Emits `authChanged(true)` then `userLoggedIn`. Always returns
    /// `Ok(true)` unless a subscriber fails.
    pub fn login(&self, username: &str, remember: bool) -> SessionResult<bool> {
        let now = self.clock.now();
        let role = {
            let mut state = self.lock();
            state.is_authenticated = true;
            state.username = username.to_string();
            state.user_role = Role::USER;
            state.last_login = Some(now);
            state.login_error = None;
            state.user_role.clone()
        };

        if remember {
            self.remember(&PersistedSession::new(username, now));
        }
        tracing::info!(username, remember, "user logged in");

        self.emit(AuthEvent::AuthChanged(true))?;
        self.emit(AuthEvent::UserLoggedIn(UserLoggedIn {
            username: username.to_string(),
            role,
        }))?;
        Ok(true)
    }

    /// Record a failed login attempt reported by the caller.
    ///
    /// Authentication state is untouched and no event is published. Always
    /// returns `false`.
    pub fn login_failed(&self, message: Option<&str>) -> bool {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_LOGIN_ERROR);
        self.lock().login_error = Some(message.to_string());
        tracing::debug!(reason = message, "login failed");
        false
    }

    /// Return to anonymous and forget any remembered login.
    ///
    /// Emits `authChanged(false)` then `userLoggedOut`.
    pub fn logout(&self) -> SessionResult<bool> {
        let previous = {
            let mut state = self.lock();
            state.is_authenticated = false;
            state.user_role = Role::none();
            state.login_error = None;
            std::mem::take(&mut state.username)
        };

        self.forget();
        tracing::info!(username = %previous, "user logged out");

        self.emit(AuthEvent::AuthChanged(false))?;
        self.emit(AuthEvent::UserLoggedOut)?;
        Ok(true)
    }

    /// Restore a remembered login, if any.
    ///
    /// A usable record re-activates the session via a non-remembering
    /// `login`, so the stored record (and its timestamp) stays as written.
    /// An unreadable or malformed record is deleted. Storage trouble is
    /// never returned as an error.
    pub fn check_saved_auth(&self) -> SessionResult<bool> {
        let raw = match self.store.get_item(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(false),
            Err(err) => {
                tracing::warn!(key = %self.storage_key, "failed to read saved session: {err}");
                self.forget();
                return Ok(false);
            }
        };

        match PersistedSession::parse(&raw) {
            Ok(record) => {
                tracing::debug!(username = record.username(), "restoring saved session");
                self.login(record.username(), false)?;
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(key = %self.storage_key, "discarding saved session: {err}");
                self.forget();
                Ok(false)
            }
        }
    }

    /// Replace the role label and emit `userRoleChanged`.
    pub fn update_user_role(&self, role: impl Into<Role>) -> SessionResult<()> {
        let role = role.into();
        self.lock().user_role = role.clone();
        tracing::debug!(role = %role, "user role changed");
        self.emit(AuthEvent::UserRoleChanged(role))
    }

    fn remember(&self, record: &PersistedSession) {
        let result = record
            .to_json()
            .map_err(shell_core::StorageError::from)
            .and_then(|json| self.store.set_item(&self.storage_key, &json));
        if let Err(err) = result {
            tracing::warn!(key = %self.storage_key, "failed to persist session: {err}");
        }
    }

    fn forget(&self) {
        if let Err(err) = self.store.remove_item(&self.storage_key) {
            tracing::warn!(key = %self.storage_key, "failed to remove saved session: {err}");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated
    }

    pub fn username(&self) -> String {
        self.lock().username.clone()
    }

    pub fn user_role(&self) -> Role {
        self.lock().user_role.clone()
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.lock().last_login
    }

    pub fn login_error(&self) -> Option<String> {
        self.lock().login_error.clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.lock().status()
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }
}

impl core::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.snapshot())
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}
