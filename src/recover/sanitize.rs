/// C0 (0x00-0x1F), DEL, and C1 (0x80-0x9F) control characters.
fn is_stripped_control(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1F | 0x7F..=0x9F)
}

/// Remove every control character, then trim surrounding whitespace.
pub fn sanitize(candidate: &str) -> String {
    let filtered: String = candidate.chars().filter(|c| !is_stripped_control(*c)).collect();
    filtered.trim().to_string()
}
