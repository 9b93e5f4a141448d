//! Request bodies and their validation.
//!
//! Bodies are parsed from raw bytes so a malformed payload becomes a typed
//! `INVALID_INPUT` instead of a framework rejection.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::lesson::{Level, LessonMeta};

pub const DEFAULT_LOCALE: &str = "zh-TW";

fn parse_object(body: &[u8]) -> Result<Value, PipelineError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::invalid_input(format!("request body is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(PipelineError::invalid_input("request body must be a JSON object"));
    }
    Ok(value)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
struct RawLessonRequest {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    goal: Option<String>,
}

/// A validated compose request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRequest {
    pub topic: String,
    pub level: Level,
    pub locale: String,
    pub goal: Option<String>,
}

impl LessonRequest {
    pub fn new(topic: &str, level: Level, locale: &str, goal: Option<String>) -> Result<Self, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::invalid_input("topic is required"));
        }
        let locale = locale.trim();
        Ok(Self {
            topic: topic.to_string(),
            level,
            locale: if locale.is_empty() { DEFAULT_LOCALE } else { locale }.to_string(),
            goal: optional_text(goal),
        })
    }

    pub fn from_body(body: &[u8]) -> Result<Self, PipelineError> {
        let value = parse_object(body)?;
        let raw: RawLessonRequest = serde_json::from_value(value)
            .map_err(|e| PipelineError::invalid_input(format!("malformed request: {}", e)))?;

        let level = match optional_text(raw.level) {
            None => Level::default(),
            Some(level) => Level::from_str_case(&level).ok_or_else(|| {
                PipelineError::invalid_input(format!(
                    "level must be one of beginner, intermediate, advanced (got '{}')",
                    level
                ))
            })?,
        };

        Self::new(
            raw.topic.as_deref().unwrap_or_default(),
            level,
            raw.locale.as_deref().unwrap_or_default(),
            raw.goal,
        )
    }

    /// Request-derived lesson metadata; `duration_min` is the fallback.
    pub fn meta_seed(&self, default_duration_min: u32) -> LessonMeta {
        LessonMeta {
            topic: self.topic.clone(),
            level: self.level,
            locale: self.locale.clone(),
            duration_min: default_duration_min,
        }
    }
}

/// Follow-up actions on an existing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterateAction {
    ExplainDifferently,
    MoreExamples,
    MiniQuiz,
}

impl IterateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterateAction::ExplainDifferently => "explain-differently",
            IterateAction::MoreExamples => "more-examples",
            IterateAction::MiniQuiz => "mini-quiz",
        }
    }

    pub fn from_str_case(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "explain-differently" => Some(IterateAction::ExplainDifferently),
            "more-examples" => Some(IterateAction::MoreExamples),
            "mini-quiz" => Some(IterateAction::MiniQuiz),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawIterateRequest {
    #[serde(default, rename = "songPlan")]
    song_plan: Option<Value>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterateRequest {
    pub song_plan: Value,
    pub action: IterateAction,
    pub context: Option<String>,
}

fn require_plan(plan: Option<Value>) -> Result<Value, PipelineError> {
    match plan {
        Some(plan @ Value::Object(_)) => Ok(plan),
        Some(_) => Err(PipelineError::invalid_input("songPlan must be a JSON object")),
        None => Err(PipelineError::invalid_input("songPlan is required")),
    }
}

impl IterateRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, PipelineError> {
        let raw: RawIterateRequest = serde_json::from_value(parse_object(body)?)
            .map_err(|e| PipelineError::invalid_input(format!("malformed request: {}", e)))?;

        let song_plan = require_plan(raw.song_plan)?;
        let action_text = optional_text(raw.action)
            .ok_or_else(|| PipelineError::invalid_input("action is required"))?;
        let action = IterateAction::from_str_case(&action_text).ok_or_else(|| {
            PipelineError::invalid_input(format!(
                "action must be one of explain-differently, more-examples, mini-quiz (got '{}')",
                action_text
            ))
        })?;

        Ok(Self {
            song_plan,
            action,
            context: optional_text(raw.context),
        })
    }
}

#[derive(Deserialize)]
struct RawSummarizeRequest {
    #[serde(default, rename = "songPlan")]
    song_plan: Option<Value>,
    #[serde(default, rename = "userAnswers")]
    user_answers: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    pub song_plan: Value,
    pub user_answers: Value,
}

impl SummarizeRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, PipelineError> {
        let raw: RawSummarizeRequest = serde_json::from_value(parse_object(body)?)
            .map_err(|e| PipelineError::invalid_input(format!("malformed request: {}", e)))?;

        Ok(Self {
            song_plan: require_plan(raw.song_plan)?,
            user_answers: raw
                .user_answers
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn code_of<T: std::fmt::Debug>(result: Result<T, PipelineError>) -> ErrorCode {
        result.unwrap_err().code()
    }

    #[test]
    fn test_defaults_applied() {
        let req = LessonRequest::from_body(br#"{"topic": "  Fractions  "}"#).unwrap();
        assert_eq!(req.topic, "Fractions");
        assert_eq!(req.level, Level::Beginner);
        assert_eq!(req.locale, "zh-TW");
        assert_eq!(req.goal, None);
    }

    #[test]
    fn test_all_fields() {
        let body = br#"{"topic":"Vectors","level":"Advanced","locale":"en-US","goal":" exam prep "}"#;
        let req = LessonRequest::from_body(body).unwrap();
        assert_eq!(req.level, Level::Advanced);
        assert_eq!(req.locale, "en-US");
        assert_eq!(req.goal.as_deref(), Some("exam prep"));
    }

    #[test]
    fn test_empty_topic_is_invalid() {
        assert_eq!(code_of(LessonRequest::from_body(br#"{"topic": ""}"#)), ErrorCode::InvalidInput);
        assert_eq!(code_of(LessonRequest::from_body(br#"{"topic": "   "}"#)), ErrorCode::InvalidInput);
        assert_eq!(code_of(LessonRequest::from_body(br#"{}"#)), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_malformed_bodies_are_invalid() {
        for body in [&b"not json"[..], b"[1,2]", b"\"topic\"", br#"{"topic": 5}"#, b""] {
            assert_eq!(code_of(LessonRequest::from_body(body)), ErrorCode::InvalidInput);
        }
    }

    #[test]
    fn test_unknown_level_is_invalid() {
        let err = LessonRequest::from_body(br#"{"topic":"x","level":"expert"}"#).unwrap_err();
        assert!(err.to_string().contains("expert"));
    }

    #[test]
    fn test_meta_seed() {
        let req = LessonRequest::from_body(br#"{"topic":"x","locale":"en-US"}"#).unwrap();
        let seed = req.meta_seed(22);
        assert_eq!(seed.topic, "x");
        assert_eq!(seed.duration_min, 22);
    }

    #[test]
    fn test_iterate_request() {
        let body = br#"{"songPlan":{"S":{}},"action":"mini-quiz","context":"  "}"#;
        let req = IterateRequest::from_body(body).unwrap();
        assert_eq!(req.action, IterateAction::MiniQuiz);
        assert_eq!(req.context, None);

        let missing = br#"{"action":"mini-quiz"}"#;
        assert_eq!(code_of(IterateRequest::from_body(missing)), ErrorCode::InvalidInput);
        let bad = br#"{"songPlan":{},"action":"dance"}"#;
        assert_eq!(code_of(IterateRequest::from_body(bad)), ErrorCode::InvalidInput);
        let not_obj = br#"{"songPlan":"plan","action":"mini-quiz"}"#;
        assert_eq!(code_of(IterateRequest::from_body(not_obj)), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_summarize_request_defaults_answers() {
        let req = SummarizeRequest::from_body(br#"{"songPlan":{"G":{}}}"#).unwrap();
        assert_eq!(req.user_answers, serde_json::json!({}));
        assert_eq!(
            code_of(SummarizeRequest::from_body(br#"{"userAnswers":[]}"#)),
            ErrorCode::InvalidInput
        );
    }
}
