// crates/reelsmith-core/src/sanitize.rs
//
// Output-name sanitization applied before any path is built from a
// user-supplied name. Pure string transform, no locale dependency.

/// Characters that are rejected by at least one mainstream filesystem.
const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace every invalid character with `_`, then trim surrounding
/// whitespace. Idempotent: sanitizing a sanitized name is a no-op.
///
/// ```
/// use reelsmith_core::sanitize::sanitize_filename;
/// assert_eq!(sanitize_filename(" a.txt "), "a.txt");
/// assert_eq!(sanitize_filename("shorts: day|1"), "shorts_ day_1");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.replace(|c| INVALID.contains(&c), "_")
        .trim()
        .to_string()
}
