//! Page text helpers

/// Truncate `text` to at most `cap` characters.
///
/// Returns the (possibly shortened) text and, if truncation happened, the
/// original character count. Never splits a UTF-8 sequence.
pub fn truncate_text(mut text: String, cap: usize) -> (String, Option<usize>) {
    match text.char_indices().nth(cap) {
        None => (text, None),
        Some((byte_end, _)) => {
            let original = text.chars().count();
            text.truncate(byte_end);
            (text, Some(original))
        }
    }
}
