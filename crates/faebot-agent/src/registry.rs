//! Channel-keyed store of conversation state.
//!
//! Each channel's state sits behind its own async mutex so that one channel's
//! slow work never blocks another. Creation goes through the map's entry API,
//! which guarantees a channel is initialised at most once no matter how many
//! callers race on it.

use std::sync::Arc;

use dashmap::DashMap;
use faebot_core::ChannelName;
use tokio::sync::Mutex;
use tracing::info;

use crate::state::ChannelState;

pub type SharedState = Arc<Mutex<ChannelState>>;

#[derive(Default)]
pub struct ConversationRegistry {
    states: DashMap<ChannelName, SharedState>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the channel's state, creating it with `make` on first sight.
    /// `make` runs at most once per channel.
    pub fn get_or_create<F>(&self, channel: &ChannelName, make: F) -> SharedState
    where
        F: FnOnce(&ChannelName) -> ChannelState,
    {
        let entry = self.states.entry(channel.clone()).or_insert_with(|| {
            info!(channel = %channel, "new channel state");
            Arc::new(Mutex::new(make(channel)))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, channel: &ChannelName) -> Option<SharedState> {
        self.states.get(channel).map(|e| Arc::clone(e.value()))
    }

    /// Drop a channel's state. In-flight work holding the old handle keeps it
    /// alive until done; later lookups see nothing.
    pub fn remove(&self, channel: &ChannelName) -> bool {
        let removed = self.states.remove(channel).is_some();
        if removed {
            info!(channel = %channel, "channel state removed");
        }
        removed
    }

    /// Names of all channels with live state, sorted.
    pub fn channels(&self) -> Vec<ChannelName> {
        let mut names: Vec<ChannelName> = self.states.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
