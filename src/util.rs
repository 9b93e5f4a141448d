/// Truncate a string to at most `max_chars` characters (Unicode-safe, no marker).
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Truncate for display, appending "..." when something was cut.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Replace every occurrence of `secret` with a fixed marker.
///
/// Upstream error bodies sometimes echo request headers back; this keeps the
/// API key out of anything we forward to a caller or a log line.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if secret.len() >= 8 => text.replace(secret, "[redacted]"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{redact, truncate, truncate_str};

    #[test]
    fn test_truncate_str_is_char_boundary_safe() {
        assert_eq!(truncate_str("ééééé", 2), "éé");
        assert_eq!(truncate_str("abc", 10), "abc");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn test_truncate_unicode_safe() {
        let input = "ééééé";
        assert_eq!(truncate(input, 4), "é...");
    }

    #[test]
    fn test_truncate_small_max() {
        let input = "こんにちは";
        assert_eq!(truncate(input, 3), "こんに");
        assert_eq!(truncate(input, 0), "");
    }

    #[test]
    fn test_redact_hides_secret() {
        let body = "bad key sk-test-12345678 supplied";
        assert_eq!(
            redact(body, Some("sk-test-12345678")),
            "bad key [redacted] supplied"
        );
        assert_eq!(redact(body, None), body);
        // Very short secrets would shred unrelated text.
        assert_eq!(redact(body, Some("sk")), body);
    }
}
