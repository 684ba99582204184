use crate::provider::ProviderError;

/// Sent in place of a reply when the provider call fails.
pub const APOLOGY: &str = "sorry, I'm having trouble thinking right now. try again in a bit?";

/// Result of one provider call, classified against the chat message ceiling.
#[derive(Debug)]
pub enum Generation {
    Complete(String),
    /// Provider text that exceeds the ceiling; carries the full output.
    TooLong(String),
    Failed(ProviderError),
}

impl Generation {
    /// Classify a provider result. The completion is reduced to the bot's own
    /// turn on a single line first; an empty completion counts as a failure.
    pub fn classify(result: Result<String, ProviderError>, max_chars: usize) -> Self {
        match result {
            Err(e) => Self::Failed(e),
            Ok(text) => {
                let text = own_turn(&text);
                if text.is_empty() {
                    Self::Failed(ProviderError::Empty)
                } else if text.chars().count() > max_chars {
                    Self::TooLong(text)
                } else {
                    Self::Complete(text)
                }
            }
        }
    }
}

/// Keep the completion up to the first line that opens another speaker's
/// turn (`name: ...`), joined into one whitespace-collapsed line.
pub fn own_turn(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.lines() {
        if !kept.is_empty() && is_speaker_line(line) {
            break;
        }
        kept.extend(line.split_whitespace());
    }
    kept.join(" ")
}

fn is_speaker_line(line: &str) -> bool {
    match line.trim_start().split_once(':') {
        Some((label, _)) => {
            !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '_')
        }
        None => false,
    }
}
