//! Detection of the "not done" marker learners remove to request verification.

/// Marker used when the configuration does not override it.
pub const DEFAULT_MARKER: &str = "I AM NOT DONE";

/// True if any comment line in `source` starts with `marker`.
///
/// Whitespace inside the comment is normalized, so `//I  AM NOT DONE` and
/// `// I AM NOT DONE` both count. Occurrences outside comments (for example in
/// string literals) do not.
pub fn contains_marker(source: &str, marker: &str) -> bool {
    let wanted = collapse_whitespace(marker);
    if wanted.is_empty() {
        return false;
    }
    source.lines().any(|line| {
        let Some(comment) = line.trim_start().strip_prefix("//") else {
            return false;
        };
        collapse_whitespace(comment.trim_start_matches('/')).starts_with(&wanted)
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
