use thiserror::Error;

use shell_events::PublishError;

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that escape session operations.
///
/// Storage problems never do: they are logged and the in-memory state wins.
/// A failing event subscriber does, since that is an integration bug.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Publish(#[from] PublishError),
}
