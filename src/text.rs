//! Text trimming helpers.
//!
//! [`truncate_sentences`] shortens model output (and the substitute day plan)
//! to a fixed number of sentences. A sentence boundary is a `.`, `!` or `?`
//! immediately followed by whitespace; the whitespace run is dropped and the
//! kept fragments are re-joined with a single space. Because the joined
//! output has exactly one boundary between fragments, truncating it again
//! with the same limit returns it unchanged.
//!
//! [`take_chars`] caps text by character count without splitting a
//! multi-byte character.

/// Split `text` (already trimmed) after every sentence terminator that is
/// followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let end = idx + ch.len_utf8();
        let mut next = end;
        while let Some(&(ws_idx, ws)) = chars.peek() {
            if !ws.is_whitespace() {
                break;
            }
            next = ws_idx + ws.len_utf8();
            chars.next();
        }
        if next > end {
            fragments.push(&text[start..end]);
            start = next;
        }
    }

    if start < text.len() {
        fragments.push(&text[start..]);
    }
    fragments
}

/// Keep at most `max_sentences` sentences of `text`.
pub fn truncate_sentences(text: &str, max_sentences: usize) -> String {
    let fragments = split_sentences(text.trim());
    fragments
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Return the first `max_chars` characters of `text`.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
