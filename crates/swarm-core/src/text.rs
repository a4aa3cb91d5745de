//! Text utilities.

/// Truncate a string to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `max` characters, appending an ellipsis when truncated.
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}…", truncate_str(s, max))
    } else {
        s.to_owned()
    }
}
