use faebot_core::ChannelName;

/// Per-channel conversation record: tunable behaviour plus the rolling
/// transcript the prompt is built from.
///
/// Owned by [`ConversationRegistry`](crate::registry::ConversationRegistry);
/// everything else resolves it by channel name for the duration of one unit
/// of work.
#[derive(Debug, Clone)]
pub struct ChannelState {
    channel: ChannelName,
    transcript: Vec<String>,
    /// Persona/system instruction sent alongside every prompt.
    pub persona_prompt: String,
    /// 0 = only reply when mentioned, 1 = always, N = one in N messages.
    pub frequency: u32,
    history_limit: usize,
    pub current_model: String,
    /// Suppresses every non-command reply, mentions included.
    pub silenced: bool,
}

/// Values handed to a freshly observed channel.
#[derive(Debug, Clone)]
pub struct ChannelDefaults {
    pub persona_prompt: String,
    pub frequency: u32,
    pub history_limit: usize,
    pub model: String,
}

impl ChannelState {
    pub fn new(channel: ChannelName, defaults: ChannelDefaults) -> Self {
        Self {
            channel,
            transcript: Vec::new(),
            persona_prompt: defaults.persona_prompt,
            frequency: defaults.frequency,
            history_limit: defaults.history_limit.max(1),
            current_model: defaults.model,
            silenced: false,
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Append a rendered `"<author>: <text>"` line. No trimming happens here;
    /// the window is enforced right before a prompt is built.
    pub fn push_line(&mut self, author: &str, text: &str) {
        self.transcript.push(format!("{author}: {text}"));
    }

    /// Drop the whole transcript. Returns how many lines were removed.
    pub fn clear_transcript(&mut self) -> usize {
        let n = self.transcript.len();
        self.transcript.clear();
        n
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Set the transcript window. Zero is rejected (returns `false`).
    pub fn set_history_limit(&mut self, limit: usize) -> bool {
        if limit == 0 {
            return false;
        }
        self.history_limit = limit;
        true
    }

    /// Discard the oldest lines so at most `history_limit` remain, keeping
    /// relative order. Returns how many lines were dropped.
    pub fn trim_to_window(&mut self) -> usize {
        let excess = self.transcript.len().saturating_sub(self.history_limit);
        if excess > 0 {
            self.transcript.drain(..excess);
        }
        excess
    }
}
