//! Small text helpers shared across crates.

/// Char-boundary-safe prefix of `text` for log lines, with an ellipsis when cut.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Lowercased, trimmed form used for command and trigger matching.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
