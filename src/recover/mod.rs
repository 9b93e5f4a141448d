//! Response recovery: pull a JSON value out of free-form model text.
//!
//! Strictly linear: extract → sanitize → layered parse. Each stage is a pure
//! function of its input.

mod extract;
mod parse;
mod sanitize;

pub use extract::extract_candidate;
pub use parse::{parse_layered, NotJson};
pub use sanitize::sanitize;

use serde_json::Value;

/// Run the full recovery chain over raw model output.
pub fn recover_json(raw: &str) -> Result<Value, NotJson> {
    let candidate = extract_candidate(raw);
    let sanitized = sanitize(&candidate);
    if sanitized.is_empty() {
        return Err(NotJson("model output is empty".to_string()));
    }
    parse_layered(&sanitized)
}
