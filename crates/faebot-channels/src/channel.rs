use async_trait::async_trait;
use faebot_core::ChannelName;
use tokio::sync::mpsc;

use crate::{error::ChannelError, types::InboundMessage};

/// Common interface implemented by every chat transport (Twitch, test fakes, …).
///
/// Implementations must be `Send + Sync` so one instance can be shared as
/// `Arc<dyn ChatChannel>` between the listener task, the ingestion loop and
/// spawned generation tasks.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Stable lowercase identifier for this transport (e.g. `"twitch"`).
    fn name(&self) -> &str;

    /// Deliver a single line of text to a joined channel.
    ///
    /// Fails with [`ChannelError::ContentTooLong`] when `text` exceeds the
    /// platform's per-message ceiling; callers may truncate and retry.
    async fn send(&self, channel: &ChannelName, text: &str) -> Result<(), ChannelError>;

    /// Start receiving messages from `channel`.
    async fn join(&self, channel: &ChannelName) -> Result<(), ChannelError>;

    /// Stop receiving messages from `channel`.
    async fn part(&self, channel: &ChannelName) -> Result<(), ChannelError>;

    /// Connect and forward every observed message to `tx` until the connection
    /// drops (`Err`) or the receiver is closed (`Ok`).
    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<(), ChannelError>;
}
