//! Identifier comparison helpers shared by the catalog and the query crate.

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(name)
}

/// Canonical lookup key: unquoted and lowercased.
pub fn key(name: &str) -> String {
    unquote(name).to_lowercase()
}

/// Case-insensitive identifier equality, ignoring surrounding quotes.
pub fn same(a: &str, b: &str) -> bool {
    unquote(a).eq_ignore_ascii_case(unquote(b))
}
