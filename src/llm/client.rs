use super::models::{ModelContent, ProbeReply, UpstreamReply, Usage};
use super::{GenerationRequest, ModelApi, OutputFormat, UpstreamError};
use crate::config::Config;
use crate::util::{redact, truncate_str};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

const PROBE_PROMPT: &str = "Say: ok";

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextConfig<'a>>,
}

#[derive(Serialize)]
struct InputMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct TextConfig<'a> {
    format: TextFormat<'a>,
}

/// `text.format` of the Responses API.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TextFormat<'a> {
    JsonObject,
    JsonSchema {
        name: &'a str,
        schema: &'a Value,
        strict: bool,
    },
}

/// Client for an OpenAI-compatible Responses endpoint. No retries: a failed
/// call is reported to the caller as-is.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    url: String,
    model: String,
    timeout_ms: u64,
    max_detail_chars: usize,
}

/// Create a configured HTTP client for upstream requests
fn create_http_client(timeout_ms: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

impl OpenAiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            http: create_http_client(config.timeout_ms)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            url: config.responses_url(),
            model: config.model.clone(),
            timeout_ms: config.timeout_ms,
            max_detail_chars: config.max_detail_chars,
        })
    }

    /// Redact the key and cap the length of anything we pass back.
    fn clip(&self, body: &str) -> String {
        let scrubbed = redact(body, self.api_key.as_deref());
        truncate_str(&scrubbed, self.max_detail_chars).to_string()
    }

    fn map_send_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_ms)
        } else {
            UpstreamError::Network(self.clip(&err.to_string()))
        }
    }

    fn request_body<'a>(&'a self, request: &'a GenerationRequest) -> ResponsesRequest<'a> {
        let format = match &request.format {
            OutputFormat::Text => None,
            OutputFormat::JsonObject => Some(TextFormat::JsonObject),
            OutputFormat::JsonSchema { name, schema } => Some(TextFormat::JsonSchema {
                name,
                schema,
                strict: true,
            }),
        };

        ResponsesRequest {
            model: &self.model,
            input: vec![
                InputMessage {
                    role: "system",
                    content: &request.system,
                },
                InputMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_output_tokens: Some(request.max_output_tokens),
            temperature: request.temperature,
            text: format.map(|format| TextConfig { format }),
        }
    }

    /// POST the body and return the status and text, bounded by the timeout.
    async fn post<T: Serialize>(&self, body: &T) -> Result<(u16, String), UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredentials)?;

        let exchange = async {
            let response = self
                .http
                .post(&self.url)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", api_key))
                .json(body)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;
            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| self.map_send_error(e))?;
            Ok::<_, UpstreamError>((status, text))
        };

        timeout(Duration::from_millis(self.timeout_ms), exchange)
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout_ms))?
    }

    async fn generate_inner(
        &self,
        request: &GenerationRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        let body = self.request_body(request);
        let (status, text) = self.post(&body).await?;

        if !(200..300).contains(&status) {
            warn!(status, "model API returned a non-success status");
            return Err(UpstreamError::Status {
                status,
                body: self.clip(&text),
            });
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            UpstreamError::Decode(format!("{}: {}", e, self.clip(&text)))
        })?;
        let reply = pluck_reply(&parsed).map_err(|msg| UpstreamError::Decode(self.clip(&msg)))?;

        if let Some(usage) = &reply.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                total_tokens = usage.total_tokens,
                model = %reply.model,
                "model usage"
            );
        }
        if let Some(reason) = &reply.incomplete_reason {
            warn!(reason = %reason, "model response is incomplete");
        }
        Ok(reply)
    }

    async fn probe_inner(&self) -> Result<ProbeReply, UpstreamError> {
        let body = ResponsesRequest {
            model: &self.model,
            input: vec![InputMessage {
                role: "user",
                content: PROBE_PROMPT,
            }],
            max_output_tokens: None,
            temperature: None,
            text: None,
        };
        let (status, text) = self.post(&body).await?;
        Ok(ProbeReply {
            status,
            body: self.clip(&text),
        })
    }
}

impl ModelApi for OpenAiClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<UpstreamReply, UpstreamError>> {
        self.generate_inner(request).boxed()
    }

    fn probe(&self) -> BoxFuture<'_, Result<ProbeReply, UpstreamError>> {
        self.probe_inner().boxed()
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

fn content_parts(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Pick the model output out of a Responses API body.
///
/// Structured values win over text; the whole body is the last resort so a
/// caller can still see what came back.
pub(crate) fn pluck_reply(body: &Value) -> Result<UpstreamReply, String> {
    if let Some(message) = body
        .get("error")
        .filter(|e| !e.is_null())
        .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
    {
        return Err(format!("model API reported an error: {}", message));
    }

    let usage = body
        .get("usage")
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());
    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let incomplete_reason = (body.get("status").and_then(Value::as_str) == Some("incomplete"))
        .then(|| {
            body.pointer("/incomplete_details/reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        });

    let content = if let Some(parsed) = body.get("output_parsed").filter(|v| !v.is_null()) {
        ModelContent::Structured(parsed.clone())
    } else if let Some(json) = content_parts(body)
        .filter_map(|part| part.get("json"))
        .find(|v| !v.is_null())
    {
        ModelContent::Structured(json.clone())
    } else if let Some(text) = non_empty_str(body.get("output_text")) {
        ModelContent::Text(text.to_string())
    } else {
        let joined: String = content_parts(body)
            .filter_map(|part| {
                let kind = part.get("type").and_then(Value::as_str).unwrap_or("text");
                match kind {
                    "output_text" | "text" => part.get("text").and_then(Value::as_str),
                    "refusal" => part.get("refusal").and_then(Value::as_str),
                    _ => None,
                }
            })
            .collect();
        if !joined.trim().is_empty() {
            ModelContent::Text(joined)
        } else if let Some(text) = non_empty_str(body.pointer("/content/0/text")) {
            ModelContent::Text(text.to_string())
        } else {
            ModelContent::Text(body.to_string())
        }
    };

    Ok(UpstreamReply {
        content,
        usage,
        model,
        incomplete_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(max_detail_chars: usize) -> OpenAiClient {
        let config = Config {
            api_key: Some("sk-test-secret-key".to_string()),
            max_detail_chars,
            ..Config::default()
        };
        OpenAiClient::new(&config).unwrap()
    }

    fn request(format: OutputFormat) -> GenerationRequest {
        GenerationRequest {
            system: "sys".to_string(),
            user: "usr".to_string(),
            format,
            max_output_tokens: 1200,
            temperature: Some(0.5),
        }
    }

    #[test]
    fn test_request_body_with_schema() {
        let c = client(4000);
        let req = request(OutputFormat::JsonSchema {
            name: "song_lesson".to_string(),
            schema: json!({"type": "object"}),
        });
        let value = serde_json::to_value(c.request_body(&req)).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["input"][0]["role"], "system");
        assert_eq!(value["input"][1]["content"], "usr");
        assert_eq!(value["max_output_tokens"], 1200);
        assert_eq!(value["text"]["format"]["type"], "json_schema");
        assert_eq!(value["text"]["format"]["name"], "song_lesson");
        assert_eq!(value["text"]["format"]["strict"], true);
        assert_eq!(value["text"]["format"]["schema"]["type"], "object");
    }

    #[test]
    fn test_request_body_json_object_and_text() {
        let c = client(4000);
        let value = serde_json::to_value(c.request_body(&request(OutputFormat::JsonObject))).unwrap();
        assert_eq!(value["text"]["format"], json!({"type": "json_object"}));

        let mut plain = request(OutputFormat::Text);
        plain.temperature = None;
        let value = serde_json::to_value(c.request_body(&plain)).unwrap();
        assert!(value.get("text").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_clip_truncates_and_redacts() {
        let c = client(10);
        assert_eq!(c.clip(&"x".repeat(50)).chars().count(), 10);
        let c = client(4000);
        assert_eq!(c.clip("key sk-test-secret-key leaked"), "key [redacted] leaked");
    }

    #[test]
    fn test_pluck_output_parsed_is_structured() {
        let body = json!({"output_parsed": {"S": {}}, "output_text": "{\"S\":{}}"});
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.content, ModelContent::Structured(json!({"S": {}})));
    }

    #[test]
    fn test_pluck_content_json_is_structured() {
        let body = json!({"output": [{"type": "message", "content": [{"type": "output_json", "json": {"a": 1}}]}]});
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.content, ModelContent::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_pluck_joins_output_text_parts() {
        let body = json!({
            "model": "gpt-4o-mini-2024",
            "status": "completed",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"a\":"},
                    {"type": "output_text", "text": "1}"}
                ]}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 15}
        });
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.content, ModelContent::Text("{\"a\":1}".to_string()));
        assert_eq!(reply.model, "gpt-4o-mini-2024");
        assert_eq!(reply.usage.unwrap().total_tokens, 15);
        assert!(reply.incomplete_reason.is_none());
    }

    #[test]
    fn test_pluck_reports_incomplete_reason() {
        let body = json!({
            "status": "incomplete",
            "incomplete_details": {"reason": "max_output_tokens"},
            "output_text": "{\"S\": {"
        });
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.incomplete_reason.as_deref(), Some("max_output_tokens"));
    }

    #[test]
    fn test_pluck_refusal_becomes_text() {
        let body = json!({"output": [{"content": [{"type": "refusal", "refusal": "I can't help"}]}]});
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.content, ModelContent::Text("I can't help".to_string()));
    }

    #[test]
    fn test_pluck_legacy_content_shape() {
        let body = json!({"content": [{"text": "hello"}]});
        let reply = pluck_reply(&body).unwrap();
        assert_eq!(reply.content, ModelContent::Text("hello".to_string()));
    }

    #[test]
    fn test_pluck_error_object() {
        let body = json!({"error": {"message": "model overloaded"}});
        assert!(pluck_reply(&body).unwrap_err().contains("model overloaded"));
        let ok = json!({"error": null, "output_text": "x"});
        assert!(pluck_reply(&ok).is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_without_network() {
        let c = OpenAiClient::new(&Config::default()).unwrap();
        assert!(!c.has_credentials());
        let req = request(OutputFormat::Text);
        let err = c.generate(&req).await.unwrap_err();
        assert_eq!(err, UpstreamError::MissingCredentials);
    }
}
