use serde_json::Value;
use thiserror::Error;

/// All parse tiers failed; carries the last parser message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NotJson(pub String);

impl From<serde_json::Error> for NotJson {
    fn from(err: serde_json::Error) -> Self {
        NotJson(err.to_string())
    }
}

fn parse_direct(text: &str) -> Result<Value, NotJson> {
    Ok(serde_json::from_str::<Value>(text)?)
}

/// A string result means the model serialized its JSON twice.
fn unwrap_double_encoded(value: Value) -> Result<Value, NotJson> {
    match value {
        Value::String(inner) => parse_direct(&inner)
            .map_err(|err| NotJson(format!("double-encoded payload is not JSON: {}", err))),
        other => Ok(other),
    }
}

/// Entire text wrapped in one pair of double quotes.
fn strip_wrapping_quotes(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner)
}

/// Parse a sanitized candidate: direct parse (unwrapping one level of
/// double encoding), else strip one layer of wrapping quotes and retry.
pub fn parse_layered(candidate: &str) -> Result<Value, NotJson> {
    match parse_direct(candidate) {
        Ok(value) => unwrap_double_encoded(value),
        Err(direct_err) => strip_wrapping_quotes(candidate)
            .ok_or(direct_err)
            .and_then(parse_direct),
    }
}
