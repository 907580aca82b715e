//! Filename sanitization for downloaded resources.

/// Characters Windows refuses in file names.
const ILLEGAL: &[char] = &['*', ':', '"', '?', '<', '>', '/', '|'];

/// Replace every character that cannot appear in a file name with
/// `replacement`.
///
/// Backslashes are normalized to `/` first, so Windows-style path fragments
/// collapse into the same separator before replacement.
pub fn file_name(name: &str, replacement: &str) -> String {
    let normalized = name.replace('\\', "/");
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if ILLEGAL.contains(&c) {
            out.push_str(replacement);
        } else {
            out.push(c);
        }
    }
    out
}
