//! The remembered-login record kept in durable storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Storage key holding the record.
pub const AUTH_STORAGE_KEY: &str = "auth";

/// `{ "username": "...", "lastLogin": "<RFC 3339>" }`
///
/// `lastLogin` is informational: a missing or unreadable value never
/// invalidates the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    username: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    last_login: Option<DateTime<Utc>>,
}

/// RFC 3339 strings and epoch milliseconds (`Date.now()`); anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::String(raw) => DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    Ok(parsed)
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("saved session is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("saved session has no username")]
    MissingUsername,
}

impl PersistedSession {
    pub fn new(username: impl Into<String>, last_login: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            last_login: Some(last_login),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Parse a stored value; a record without a usable username is rejected.
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_str(raw)?;
        if record.username.is_empty() {
            return Err(RecordError::MissingUsername);
        }
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn writes_camel_case_rfc3339() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let json = PersistedSession::new("alice", at).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"username":"alice","lastLogin":"2024-05-06T07:08:09Z"}"#
        );
    }

    #[test]
    fn accepts_browser_date_strings_and_missing_timestamp() {
        let with_millis =
            PersistedSession::parse(r#"{"username":"dana","lastLogin":"2024-05-06T07:08:09.123Z"}"#)
                .unwrap();
        assert_eq!(with_millis.username(), "dana");
        assert!(with_millis.last_login().is_some());

        let bare = PersistedSession::parse(r#"{"username":"carol"}"#).unwrap();
        assert_eq!(bare.username(), "carol");
        assert_eq!(bare.last_login(), None);
    }

    #[test]
    fn unreadable_timestamp_does_not_invalidate_record() {
        let millis = PersistedSession::parse(r#"{"username":"carol","lastLogin":1717234200000}"#)
            .unwrap();
        assert_eq!(millis.username(), "carol");
        assert_eq!(
            millis.last_login(),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap())
        );

        for raw in [
            r#"{"username":"carol","lastLogin":"yesterday"}"#,
            r#"{"username":"carol","lastLogin":null}"#,
            r#"{"username":"carol","lastLogin":{"t":1}}"#,
        ] {
            let record = PersistedSession::parse(raw).unwrap();
            assert_eq!(record.username(), "carol");
            assert_eq!(record.last_login(), None);
        }
    }

    #[test]
    fn rejects_garbage_and_empty_usernames() {
        assert!(matches!(
            PersistedSession::parse("not json"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            PersistedSession::parse("null"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            PersistedSession::parse(r#"{"username":""}"#),
            Err(RecordError::MissingUsername)
        ));
        assert!(matches!(
            PersistedSession::parse("{}"),
            Err(RecordError::MissingUsername)
        ));
    }
}
