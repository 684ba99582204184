use faebot_channels::ChannelError;

/// Turn reply text into a single IRC-safe line.
///
/// IRC messages end at the first line break, so newlines are folded into
/// spaces and runs of whitespace collapsed. Text still longer than `max`
/// characters is rejected rather than silently cut.
pub fn prepare_outgoing(text: &str, max: usize) -> Result<String, ChannelError> {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = line.chars().count();
    if len > max {
        return Err(ChannelError::ContentTooLong { len, max });
    }
    Ok(line)
}

/// Strip the CTCP wrapper from a `/me` action so only the text remains.
pub fn strip_action(text: &str) -> &str {
    text.strip_prefix("\u{1}ACTION ")
        .map(|t| t.trim_end_matches('\u{1}'))
        .unwrap_or(text)
}
