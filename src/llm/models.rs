use serde::Deserialize;
use serde_json::Value;

/// Token usage reported by the Responses API.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u32,
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// What the model handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelContent {
    /// Already-parsed JSON (schema-constrained generation).
    Structured(Value),
    /// Free text that may embed JSON.
    Text(String),
}

/// One successful upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub content: ModelContent,
    pub usage: Option<Usage>,
    pub model: String,
    /// Set when the upstream stopped early (e.g. `max_output_tokens`).
    pub incomplete_reason: Option<String>,
}

impl UpstreamReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: ModelContent::Text(content.into()),
            usage: None,
            model: String::new(),
            incomplete_reason: None,
        }
    }

    pub fn structured(value: Value) -> Self {
        Self {
            content: ModelContent::Structured(value),
            usage: None,
            model: String::new(),
            incomplete_reason: None,
        }
    }

    /// Raw text of the reply, for diagnostics.
    pub fn raw_text(&self) -> String {
        match &self.content {
            ModelContent::Text(text) => text.clone(),
            ModelContent::Structured(value) => value.to_string(),
        }
    }
}

/// Raw status and body from the connectivity probe.
#[derive(Debug, Clone)]
pub struct ProbeReply {
    pub status: u16,
    pub body: String,
}
