//! Agent integration modules
//!
//! Each submodule turns a specific AI coding agent's hook payloads into chat
//! messages.

pub mod claude_code;

/// Truncate a string to at most `max` characters (by Unicode char boundary).
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Final path component of a slash-separated path, e.g. the project
/// directory name of a session's `cwd`.
pub(crate) fn short_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
