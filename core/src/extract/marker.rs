//! Begin/end delimiter helpers for carving payloads out of free-form text.

/// Interior of the first `begin`…`end` pair, without the newline that
/// directly follows `begin` or precedes `end`.
pub fn extract_block<'a>(text: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let start = text.find(begin)? + begin.len();
    let len = text[start..].find(end)?;
    Some(trim_marker_newlines(&text[start..start + len]))
}

/// Interior of the last complete `begin`…`end` pair.
///
/// Agents sometimes echo the instructions (which contain the markers) before
/// the real payload; taking the last pair skips the echo.
pub fn extract_last_block<'a>(text: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let end_at = text.rfind(end)?;
    let start = text[..end_at].rfind(begin)? + begin.len();
    Some(trim_marker_newlines(&text[start..end_at]))
}

fn trim_marker_newlines(s: &str) -> &str {
    let s = s
        .strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s);
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}
