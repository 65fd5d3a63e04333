/// Everything that can go wrong while bootstrapping or publishing.
///
/// None of these ever leave the worker: a failing cycle is logged and the next
/// tick retries.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The messaging session is absent or broken.
    #[error("messaging client not connected")]
    NotConnected,
    #[error("failed to serialize message payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no active network")]
    NetworkUnavailable,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("failed to create messaging service: {0}")]
    MessagingUnavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
    /// The dedicated worker thread could not be spawned.
    #[error("failed to spawn publisher worker: {0}")]
    Worker(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from loading a [`crate::PublisherConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
    /// The interval must be positive and the initial delay at least as long.
    #[error("invalid timing: initial delay {initial_delay_ms} ms, interval {publish_interval_ms} ms")]
    Timing {
        initial_delay_ms: u64,
        publish_interval_ms: u64,
    },
}
