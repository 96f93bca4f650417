//! Session lifecycle events published on the shell bus.
//!
//! Names and payload shapes are part of the contract with hosted modules,
//! which may decode them without linking this crate:
//!
//! | name              | payload                          |
//! |-------------------|----------------------------------|
//! | `authChanged`     | `true` / `false`                 |
//! | `userLoggedIn`    | `{ "username": .., "role": .. }` |
//! | `userLoggedOut`   | `null`                           |
//! | `userRoleChanged` | role string                      |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::roles::Role;

pub const AUTH_CHANGED: &str = "authChanged";
pub const USER_LOGGED_IN: &str = "userLoggedIn";
pub const USER_LOGGED_OUT: &str = "userLoggedOut";
pub const USER_ROLE_CHANGED: &str = "userRoleChanged";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoggedIn {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthChanged(bool),
    UserLoggedIn(UserLoggedIn),
    UserLoggedOut,
    UserRoleChanged(Role),
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::AuthChanged(_) => AUTH_CHANGED,
            AuthEvent::UserLoggedIn(_) => USER_LOGGED_IN,
            AuthEvent::UserLoggedOut => USER_LOGGED_OUT,
            AuthEvent::UserRoleChanged(_) => USER_ROLE_CHANGED,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            AuthEvent::AuthChanged(flag) => Value::Bool(*flag),
            AuthEvent::UserLoggedIn(e) => json!({
                "username": e.username,
                "role": e.role.as_str(),
            }),
            AuthEvent::UserLoggedOut => Value::Null,
            AuthEvent::UserRoleChanged(role) => Value::String(role.as_str().to_string()),
        }
    }

    /// Decode a bus delivery back into a typed event.
    ///
    /// Returns `None` for foreign event names or payloads of the wrong shape.
    pub fn decode(name: &str, payload: &Value) -> Option<Self> {
        match name {
            AUTH_CHANGED => payload.as_bool().map(AuthEvent::AuthChanged),
            USER_LOGGED_IN => serde_json::from_value(payload.clone())
                .ok()
                .map(AuthEvent::UserLoggedIn),
            USER_LOGGED_OUT => Some(AuthEvent::UserLoggedOut),
            USER_ROLE_CHANGED => payload
                .as_str()
                .map(|role| AuthEvent::UserRoleChanged(Role::new(role.to_string()))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shapes() {
        let login = AuthEvent::UserLoggedIn(UserLoggedIn {
            username: "alice".into(),
            role: Role::USER,
        });
        assert_eq!(login.name(), "userLoggedIn");
        assert_eq!(login.payload(), json!({ "username": "alice", "role": "user" }));
        assert_eq!(AuthEvent::UserLoggedOut.payload(), Value::Null);
        assert_eq!(AuthEvent::AuthChanged(false).payload(), json!(false));
    }

    #[test]
    fn decode_inverts_payload() {
        let events = [
            AuthEvent::AuthChanged(true),
            AuthEvent::UserLoggedIn(UserLoggedIn {
                username: "bob".into(),
                role: Role::new("admin"),
            }),
            AuthEvent::UserLoggedOut,
            AuthEvent::UserRoleChanged(Role::new("auditor")),
        ];
        for ev in events {
            assert_eq!(AuthEvent::decode(ev.name(), &ev.payload()), Some(ev.clone()));
        }
    }

    #[test]
    fn decode_rejects_foreign_and_malformed() {
        assert_eq!(AuthEvent::decode("cartUpdated", &json!(1)), None);
        assert_eq!(AuthEvent::decode(AUTH_CHANGED, &json!("yes")), None);
        assert_eq!(AuthEvent::decode(USER_LOGGED_IN, &json!({ "username": 1 })), None);
    }
}
