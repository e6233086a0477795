// ABOUTME: Shared utility functions for Prdsmith
// ABOUTME: Record ID generation and bounded previews for log output

use rand::Rng;

/// Length of generated record identifiers
pub const ID_LENGTH: usize = 12;

/// Generate a unique record ID (alphanumeric, nanoid style)
pub fn generate_id() -> String {
    const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Return at most `max_chars` characters of `text`, appending "..." when cut.
///
/// Counts chars rather than bytes so multi-byte text is never split mid-codepoint.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
