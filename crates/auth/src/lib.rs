//! `shell-auth`: client-side authentication session for the shell.
//!
//! No credentials are verified here; callers decide upstream whether a login
//! succeeded and report it through [`AuthSession::login`] or
//! [`AuthSession::login_failed`].

pub mod error;
pub mod events;
pub mod record;
pub mod roles;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use events::{AUTH_CHANGED, AuthEvent, USER_LOGGED_IN, USER_LOGGED_OUT, USER_ROLE_CHANGED, UserLoggedIn};
pub use record::{AUTH_STORAGE_KEY, PersistedSession, RecordError};
pub use roles::Role;
pub use session::{AuthSession, AuthStatus, DEFAULT_LOGIN_ERROR, SessionState};
