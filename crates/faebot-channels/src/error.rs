use thiserror::Error;

/// Errors that can occur within any chat transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying transport could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection dropped while listening.
    #[error("Connection closed: {0}")]
    Disconnected(String),

    /// The platform refuses messages of this length.
    #[error("Message too long: {len} chars (max {max})")]
    ContentTooLong { len: usize, max: usize },

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The channel rejected the supplied credentials or token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// An operation exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The transport configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for ChannelError {
    fn from(e: std::io::Error) -> Self {
        ChannelError::Disconnected(e.to_string())
    }
}
