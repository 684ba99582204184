use faebot_core::ChannelName;
use serde::{Deserialize, Serialize};

/// A chat message observed in a joined channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel the message was posted in.
    pub channel: ChannelName,

    /// Login name of the sender. Used as the transcript speaker label and for
    /// the administrator check.
    pub author: String,

    /// Human-readable display name for the sender, if the platform sent one.
    pub display_name: Option<String>,

    /// Whether the platform reports the sender as a channel moderator
    /// (the broadcaster counts as one).
    pub is_moderator: bool,

    /// Plain text content of the message.
    pub text: String,

    /// True for messages the bot itself sent; these are never processed.
    pub echo: bool,

    /// RFC-3339 timestamp of when the message was received.
    pub timestamp: String,
}

impl InboundMessage {
    /// Build a message stamped with the current time.
    pub fn new(channel: impl Into<ChannelName>, author: &str, text: &str) -> Self {
        Self {
            channel: channel.into(),
            author: author.to_string(),
            display_name: None,
            is_moderator: false,
            text: text.to_string(),
            echo: false,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_moderator(mut self, is_moderator: bool) -> Self {
        self.is_moderator = is_moderator;
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Display name when present, login name otherwise.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.author)
    }
}
