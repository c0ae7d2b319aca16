//! Small string helpers for configuration values and log output.

/// The trimmed value, or `None` when nothing but whitespace is left.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Trim a base URL and strip trailing slashes.
///
/// Returns `None` unless the value has an `http`/`https` scheme followed by a host.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let url = non_blank(raw)?.trim_end_matches('/');
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    non_blank(host)?;
    Some(url.to_string())
}

/// At most `max` characters of `value`, trimmed first.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.trim().chars().take(max).collect()
}
