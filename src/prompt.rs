//! Prompt templates for the three lesson operations.
//!
//! Templates are plain data with `{name}` placeholders: `{topic}`, `{level}`,
//! `{locale}` and `{goal}` for compose, `{plan}`, `{action}`, `{context}` and
//! `{answers}` for the follow-ups.

use serde_json::Value;

use crate::request::{IterateAction, LessonRequest};
use crate::util::truncate_str;

/// Serialized plans embedded in follow-up prompts are cut to this many chars.
pub const PLAN_EXCERPT_CHARS: usize = 6000;

pub const COMPOSE_SYSTEM: &str = r#"You are a tutor who understands instructional design. You build lessons with the SONG method and answer with a single JSON object only: no prose, no markdown fences.

The object has exactly these top-level keys:
- "meta": {"topic", "level", "locale", "duration_min"}
- "S" (Spark): "hook_story", "intuition", "visual_aid", "table" {"columns", "rows"}, and at least 2 "real_world_examples"
- "O" (Objectives): 3-5 measurable "goals", "prerequisites", "key_terms", "checklist"
- "N" (Nucleus): "core_explanation", "formulas", at least 2 "step_by_step" entries, a "worked_example" {"problem", "steps" (at least 2), "answer"}, and at least 1 "misconceptions" entry {"myth", "fix"}
- "G" (Generation): at least 1 "practice_sets" entry {"title", "items": [{"q", "expected", "hint"}]}, "summary", at least 1 "spaced_retrieval" prompt, "extensions"

Every list holds short, non-empty strings or the objects described above."#;

pub const COMPOSE_USER: &str = r#"Topic: {topic}
Learner level: {level}
Write the lesson in locale: {locale}
Learner goal: {goal}

Return the SONG lesson as JSON only."#;

pub const ITERATE_SYSTEM: &str = r#"You extend an existing SONG lesson. Answer with one JSON object of the form {"addon": {...}} and nothing else.

Rules per action:
- explain-differently: restate the spark with an everyday analogy and include a "paraphrase" field.
- more-examples: add 2-3 practice items, each with "q", "hint" and "solution".
- mini-quiz: write 3 single-choice questions, each {"question", "options" (4 strings), "answer", "why"}."#;

pub const SUMMARIZE_SYSTEM: &str = r#"You wrap up a SONG lesson using the learner's answers. Answer with JSON only, shaped as:
{"wrapup": {"recap": "key points in at most five lines", "corrections": ["fixes for the misconceptions shown in the answers"], "nextSteps": ["three follow-up study suggestions with keywords"], "ttsPlainText": "a simplified version suitable for text-to-speech"}}"#;

pub const ITERATE_USER: &str = "Current SONG lesson (JSON): {plan}\nAction: {action}\nContext: {context}";

pub const SUMMARIZE_USER: &str = "SONG: {plan}\nAnswers: {answers}";

/// A system/user prompt pair with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// Rendered prompt, ready for the upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// The built-in SONG compose template.
    pub fn compose() -> Self {
        Self::new(COMPOSE_SYSTEM, COMPOSE_USER)
    }

    /// Compose template with the user part replaced by a configured override.
    pub fn compose_with_override(user_override: Option<&str>) -> Self {
        match user_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(user) => Self::new(COMPOSE_SYSTEM, user),
            None => Self::compose(),
        }
    }

    pub fn iterate() -> Self {
        Self::new(ITERATE_SYSTEM, ITERATE_USER)
    }

    pub fn summarize() -> Self {
        Self::new(SUMMARIZE_SYSTEM, SUMMARIZE_USER)
    }

    /// Substitute `{name}` placeholders in both parts.
    pub fn fill(&self, values: &[(&str, &str)]) -> Prompt {
        Prompt {
            system: substitute(&self.system, values),
            user: substitute(&self.user, values),
        }
    }

    pub fn render(&self, request: &LessonRequest) -> Prompt {
        self.fill(&[
            ("topic", request.topic.as_str()),
            ("level", request.level.as_str()),
            ("locale", request.locale.as_str()),
            ("goal", request.goal.as_deref().unwrap_or("none given")),
        ])
    }

    pub fn render_iterate(&self, plan: &Value, action: IterateAction, context: Option<&str>) -> Prompt {
        let plan = plan_excerpt(plan);
        self.fill(&[
            ("plan", plan.as_str()),
            ("action", action.as_str()),
            ("context", context.unwrap_or("none")),
        ])
    }

    pub fn render_summarize(&self, plan: &Value, user_answers: &Value) -> Prompt {
        let plan = plan_excerpt(plan);
        let answers = user_answers.to_string();
        self.fill(&[("plan", plan.as_str()), ("answers", answers.as_str())])
    }
}

/// Single pass over `template`: inserted values are never rescanned, and
/// unknown `{...}` tokens are left as they are.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match known {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Compact JSON of a plan, cut to [`PLAN_EXCERPT_CHARS`].
pub fn plan_excerpt(plan: &Value) -> String {
    let text = plan.to_string();
    truncate_str(&text, PLAN_EXCERPT_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::Level;
    use serde_json::json;

    fn request() -> LessonRequest {
        LessonRequest::new("Photosynthesis", Level::Intermediate, "en-US", None).unwrap()
    }

    #[test]
    fn test_render_fills_placeholders() {
        let prompt = PromptTemplate::compose().render(&request());
        assert!(prompt.user.contains("Topic: Photosynthesis"));
        assert!(prompt.user.contains("intermediate"));
        assert!(prompt.user.contains("en-US"));
        assert!(prompt.user.contains("none given"));
        assert!(!prompt.user.contains('{'));
        assert!(prompt.system.contains("JSON"));
    }

    #[test]
    fn test_override_replaces_user_part() {
        let template = PromptTemplate::compose_with_override(Some("Teach {topic} briefly"));
        assert_eq!(template.render(&request()).user, "Teach Photosynthesis briefly");
        assert_eq!(template.system, COMPOSE_SYSTEM);

        assert_eq!(PromptTemplate::compose_with_override(Some("  ")), PromptTemplate::compose());
    }

    #[test]
    fn test_plan_excerpt_is_bounded() {
        let plan = json!({ "S": { "hook_story": "é".repeat(10_000) } });
        assert_eq!(plan_excerpt(&plan).chars().count(), PLAN_EXCERPT_CHARS);

        let small = json!({ "a": 1 });
        assert_eq!(plan_excerpt(&small), r#"{"a":1}"#);
    }

    #[test]
    fn test_iterate_prompt_names_action() {
        let prompt = PromptTemplate::iterate().render_iterate(
            &json!({}),
            IterateAction::MoreExamples,
            Some("stuck on step 2"),
        );
        assert!(prompt.user.contains("Action: more-examples"));
        assert!(prompt.user.contains("stuck on step 2"));
        assert!(prompt.system.contains("addon"));
    }

    #[test]
    fn test_summarize_prompt_embeds_answers() {
        let prompt = PromptTemplate::summarize().render_summarize(&json!({"G": {}}), &json!({"q1": "42"}));
        assert!(prompt.user.contains(r#""q1":"42""#));
        assert!(prompt.system.contains("wrapup"));
    }

    #[test]
    fn test_inserted_values_are_not_expanded_again() {
        let request =
            LessonRequest::new("Sets {level} and {goal}", Level::Advanced, "en-US", None).unwrap();
        let prompt = PromptTemplate::compose().render(&request);
        assert!(prompt.user.contains("Topic: Sets {level} and {goal}"));

        let plan = json!({ "note": "{action} {context} {answers}" });
        let prompt = PromptTemplate::iterate().render_iterate(&plan, IterateAction::MiniQuiz, None);
        assert!(prompt.user.contains(r#"{"note":"{action} {context} {answers}"}"#));
        assert!(prompt.user.contains("Action: mini-quiz"));
    }

    #[test]
    fn test_unknown_and_unclosed_braces_are_kept() {
        let template = PromptTemplate::new("{x} {topic", "a {topic} } {");
        let prompt = template.fill(&[("topic", "T")]);
        assert_eq!(prompt.system, "{x} {topic");
        assert_eq!(prompt.user, "a T } {");
    }
}
