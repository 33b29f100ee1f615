//! Digest display helpers.

/// The first `len` characters of a hex digest, for messages.
pub fn short_digest(digest: &str, len: usize) -> &str {
    match digest.char_indices().nth(len) {
        Some((end, _)) => &digest[..end],
        None => digest,
    }
}
