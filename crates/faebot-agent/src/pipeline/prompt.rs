use tracing::debug;

use crate::state::ChannelState;

/// Everything the provider needs from a channel for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Transcript lines joined by `\n`, ending with the `"\n<bot>:"` cue.
    pub prompt: String,
    pub persona: String,
    /// The (trimmed) lines the prompt was rendered from.
    pub transcript: Vec<String>,
}

/// Trim the transcript to the channel's window and render the prompt.
///
/// The trim is written back into `state`, so the window invariant holds from
/// here until the next append.
pub fn build_prompt(state: &mut ChannelState, bot_name: &str) -> AssembledPrompt {
    let dropped = state.trim_to_window();
    if dropped > 0 {
        debug!(channel = %state.channel(), dropped, "transcript trimmed");
    }

    let transcript = state.transcript().to_vec();
    let prompt = format!("{}\n{}:", transcript.join("\n"), bot_name);

    AssembledPrompt {
        prompt,
        persona: state.persona_prompt.clone(),
        transcript,
    }
}
