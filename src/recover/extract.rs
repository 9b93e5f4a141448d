use regex::Regex;
use std::sync::OnceLock;

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // An optional `json` tag, then everything up to the next closing fence.
        Regex::new(r"(?s)```[ \t]*(?i:json)?[ \t]*\r?\n?(.*?)```").expect("static fence regex")
    })
}

/// Strip markdown code fences from a response (tolerates an unclosed fence)
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

/// Byte span of a fragment between the first `open` and the last `close`.
fn fragment_span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start < end {
        Some((start, end))
    } else {
        None
    }
}

/// Return the best-guess JSON substring of `text`.
///
/// Preference order: the inner content of a fenced block, a text that is one
/// JSON string literal (double-encoded payload), the outermost `{...}` span, the outermost
/// `[...]` span, and finally the trimmed input. Never fails.
pub fn extract_candidate(text: &str) -> String {
    if let Some(caps) = fenced_block().captures(text) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim().to_string();
        }
    }

    let clean = strip_markdown_fences(text);

    // Only a well-formed string literal counts as a double-encoded payload.
    if clean.starts_with('"') && serde_json::from_str::<String>(clean).is_ok() {
        return clean.to_string();
    }

    let object = fragment_span(clean, '{', '}');
    let array = fragment_span(clean, '[', ']');
    let span = match (object, array) {
        // An array wrapping the objects is the payload, not its first element.
        (Some((os, oe)), Some((a_start, a_end))) if a_start < os && a_end > oe => {
            Some((a_start, a_end))
        }
        (Some(obj), _) => Some(obj),
        (None, arr) => arr,
    };

    match span {
        Some((start, end)) => clean[start..=end].to_string(),
        None => clean.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_block_is_preferred() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nEnjoy!";
        assert_eq!(extract_candidate(text), "{\"a\": 1}");
    }

    #[test]
    fn test_untagged_fence_is_accepted() {
        let text = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_candidate(text), "[1, 2, 3]");
    }

    #[test]
    fn test_uppercase_tag_is_accepted() {
        let text = "```JSON\n{\"a\": true}\n```";
        assert_eq!(extract_candidate(text), "{\"a\": true}");
    }

    #[test]
    fn test_fence_extraction_is_idempotent() {
        let bodies = [
            "{\"S\": {\"hook_story\": \"x\"}}",
            "[{\"q\": \"a\"}, {\"q\": \"b\"}]",
            "{\"nested\": {\"list\": [1, 2, {\"k\": \"}\"}]}}",
        ];
        for body in bodies {
            let fenced = format!("prefix\n```json\n{}\n```\nsuffix", body);
            let once = extract_candidate(&fenced);
            assert_eq!(once, body);
            assert_eq!(extract_candidate(&once), once);
        }
    }

    #[test]
    fn test_outermost_braces_in_prose() {
        let text = "Sure! {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_candidate(text), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_unclosed_fence_is_stripped() {
        let text = "```json\n{\"a\": 1}";
        assert_eq!(extract_candidate(text), "{\"a\": 1}");
    }

    #[test]
    fn test_array_fallback_without_objects() {
        let text = "values: [\"x\", \"y\"] done";
        assert_eq!(extract_candidate(text), "[\"x\", \"y\"]");
    }

    #[test]
    fn test_reversed_braces_fall_through() {
        let text = "} nothing here {";
        assert_eq!(extract_candidate(text), "} nothing here {");
    }

    #[test]
    fn test_plain_prose_is_returned_trimmed() {
        let text = "  Sure! Here's your answer: I think the topic is great.  ";
        assert_eq!(
            extract_candidate(text),
            "Sure! Here's your answer: I think the topic is great."
        );
    }

    #[test]
    fn test_double_encoded_payload_is_kept_whole() {
        let text = r#""{\"a\":1}""#;
        assert_eq!(extract_candidate(text), text);
    }

    #[test]
    fn test_quoted_prose_around_object_reaches_brace_search() {
        let text = "\"Photosynthesis\"\n{\"a\": 1}\n\"end\"";
        assert_eq!(extract_candidate(text), "{\"a\": 1}");
    }

    #[test]
    fn test_object_inside_unescaped_quotes_is_extracted() {
        let text = r#""Here is your lesson: {"a": 1} enjoy""#;
        assert_eq!(extract_candidate(text), r#"{"a": 1}"#);
    }
}
