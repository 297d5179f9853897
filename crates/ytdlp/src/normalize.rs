//! Reference normalization.

/// Host-fixed template applied to bare video ids.
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Turns a raw input line into a canonical reference.
///
/// Absolute URLs pass through unchanged; anything else is treated as a bare
/// video id and templated into a watch URL. Pure and total: malformed ids
/// are passed through uninterpreted for the resolver to reject, and an
/// empty (or all-whitespace) reference maps to the empty string so callers
/// can discard it.
pub fn normalize_reference(reference: &str) -> String {
    let line = reference.trim();
    if line.is_empty() {
        return String::new();
    }
    if line.starts_with("http://") || line.starts_with("https://") {
        return line.to_string();
    }
    format!("{WATCH_URL_PREFIX}{line}")
}
