// crates/core/src/text.rs
//! String helpers shared by the AI clients and the carousel parser.

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// character. Used when logging model or upstream output.
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
