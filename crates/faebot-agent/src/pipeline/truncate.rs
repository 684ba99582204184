//! Length trimming for outgoing chat messages.
//!
//! Counts characters, not bytes, so multi-byte sequences are never split.

pub const TRUNCATION_MARKER: char = '…';

/// Fit `text` into `max_chars` characters.
///
/// Text that already fits is returned unchanged. Otherwise the first
/// `max_chars - 1` characters are kept and [`TRUNCATION_MARKER`] is appended,
/// so the result is exactly `max_chars` characters long.
pub fn truncate_for_chat(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars || text.chars().count() <= max_chars {
        return text.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push(TRUNCATION_MARKER);
    out
}
