use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalised chat channel identifier.
///
/// Twitch channel names are case-insensitive and appear with or without the
/// IRC `#` sigil depending on where they come from (config, `!join` argument,
/// PRIVMSG target). Every lookup key goes through this type so `#Fae`, `fae`
/// and ` FAE ` all address the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().trim_start_matches('#').to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// IRC form with the leading `#`, as used in JOIN/PART/PRIVMSG.
    pub fn irc(&self) -> String {
        format!("#{}", self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for ChannelName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ChannelName> for String {
    fn from(c: ChannelName) -> Self {
        c.0
    }
}

/// Sampling knobs sent with one generation request.
///
/// Rolled fresh for every call so identical transcripts still diverge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f64,
    /// Nucleus probability.
    pub top_p: f64,
    pub top_k: u32,
    pub seed: u32,
    pub max_new_tokens: u32,
}
