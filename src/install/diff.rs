//! Line-based unified diff.
//!
//! Hunks carry three lines of context and the headers carry no timestamps,
//! so identical inputs always produce identical text.

use similar::TextDiff;

/// Context lines around each change.
pub const CONTEXT: usize = 3;

/// Unified diff of `original` against `updated`, both headers labelled
/// `label`. Returns an empty string when the inputs are equal.
pub fn unified_diff(label: &str, original: &str, updated: &str) -> String {
    if original == updated {
        return String::new();
    }
    TextDiff::from_lines(original, updated)
        .unified_diff()
        .context_radius(CONTEXT)
        .missing_newline_hint(true)
        .header(label, label)
        .to_string()
}
