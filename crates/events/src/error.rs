use thiserror::Error;

/// Failure surfaced to the caller of [`crate::EventBus::publish`].
///
/// Subscribers are not isolated from each other: the first failing handler
/// aborts the publish, later handlers and the ambient broadcast are skipped.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("subscriber to '{event}' failed: {error:#}")]
    Subscriber { event: String, error: anyhow::Error },

    #[error("failed to encode payload for '{event}': {error}")]
    Encode {
        event: String,
        error: serde_json::Error,
    },
}

impl PublishError {
    pub fn event(&self) -> &str {
        match self {
            Self::Subscriber { event, .. } | Self::Encode { event, .. } => event,
        }
    }
}
