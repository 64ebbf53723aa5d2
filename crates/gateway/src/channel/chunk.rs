//! Reply splitting for Telegram.
//!
//! Telegram measures the 4096 limit in UTF-16 code units, so characters
//! outside the Basic Multilingual Plane (most emoji) count twice. Long
//! replies are split at the last newline inside the limit, else at the last
//! space, else hard-cut on a char boundary.

/// Telegram hard limit for text messages, in UTF-16 code units.
pub const TELEGRAM_MAX_UTF16: usize = 4096;

/// Split `text` into chunks of at most `max_units` UTF-16 code units.
///
/// Empty input yields no chunks. Concatenating the chunks gives back the
/// original text. A single char wider than `max_units` still makes
/// progress as a chunk of its own.
pub fn split_message(text: &str, max_units: usize) -> Vec<String> {
    let limit = max_units.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let hard_end = match utf16_cut(remaining, limit) {
            Some(i) => i,
            None => {
                chunks.push(remaining.to_owned());
                break;
            }
        };

        let window = &remaining[..hard_end];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .filter(|&i| i > 0 && i < hard_end)
            .unwrap_or(hard_end);

        chunks.push(remaining[..split_at].to_owned());
        remaining = &remaining[split_at..];
    }

    chunks
}

/// Byte offset of the longest prefix that fits in `limit` UTF-16 units, or
/// `None` when the whole text fits. Never returns 0 for non-empty text.
fn utf16_cut(text: &str, limit: usize) -> Option<usize> {
    let mut units = 0;
    for (i, c) in text.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return Some(if i == 0 { c.len_utf8() } else { i });
        }
    }
    None
}
