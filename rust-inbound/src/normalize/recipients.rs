//! Address list splitting.

/// Split a comma-separated address list into trimmed entries.
///
/// Order is preserved and duplicates are kept. Empty fields at the end of
/// the list are dropped before trimming; blank fields elsewhere stay as
/// empty entries.
pub fn split_addresses(raw: &str) -> Vec<String> {
    let mut parts: Vec<&str> = raw.split(',').collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }

    parts.into_iter().map(|p| p.trim().to_string()).collect()
}
