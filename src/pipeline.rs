//! One configurable lesson pipeline.
//!
//! compose, iterate and summarize differ only in their [`PipelineProfile`]
//! (prompt, output format, token budget). Each run is
//! prompt → upstream → recovery → normalization, and every failure comes out
//! as a [`PipelineError`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, OutputMode};
use crate::error::PipelineError;
use crate::lesson::{
    lesson_schema, normalize_lesson, normalize_wrapup, NormalizedLesson, Shortfall, Wrapup,
    LESSON_SCHEMA_NAME,
};
use crate::llm::{GenerationRequest, ModelApi, ModelContent, OutputFormat, UpstreamReply};
use crate::prompt::{Prompt, PromptTemplate};
use crate::recover::{recover_json, NotJson};
use crate::request::{IterateRequest, LessonRequest, SummarizeRequest};
use crate::util::truncate;

/// Follow-up replies are small; their budget never exceeds this.
pub const FOLLOW_UP_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Everything that distinguishes one pipeline use from another.
#[derive(Debug, Clone)]
pub struct PipelineProfile {
    pub name: &'static str,
    pub template: PromptTemplate,
    pub format: OutputFormat,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

impl PipelineProfile {
    pub fn compose(config: &Config) -> Self {
        let format = match config.output_mode {
            OutputMode::JsonSchema => OutputFormat::JsonSchema {
                name: LESSON_SCHEMA_NAME.to_string(),
                schema: lesson_schema(),
            },
            OutputMode::JsonObject => OutputFormat::JsonObject,
            OutputMode::Text => OutputFormat::Text,
        };
        Self {
            name: "compose",
            template: PromptTemplate::compose_with_override(config.compose_prompt.as_deref()),
            format,
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    fn follow_up(name: &'static str, template: PromptTemplate, config: &Config) -> Self {
        let format = match config.output_mode {
            OutputMode::Text => OutputFormat::Text,
            OutputMode::JsonSchema | OutputMode::JsonObject => OutputFormat::JsonObject,
        };
        Self {
            name,
            template,
            format,
            max_output_tokens: config.max_output_tokens.min(FOLLOW_UP_MAX_OUTPUT_TOKENS),
            temperature: config.temperature,
        }
    }

    pub fn iterate(config: &Config) -> Self {
        Self::follow_up("iterate", PromptTemplate::iterate(), config)
    }

    pub fn summarize(config: &Config) -> Self {
        Self::follow_up("summarize", PromptTemplate::summarize(), config)
    }

    fn request_for(&self, prompt: Prompt) -> GenerationRequest {
        GenerationRequest {
            system: prompt.system,
            user: prompt.user,
            format: self.format.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

pub struct LessonPipeline {
    model: Arc<dyn ModelApi>,
    compose: PipelineProfile,
    iterate: PipelineProfile,
    summarize: PipelineProfile,
    default_duration_min: u32,
    max_detail_chars: usize,
}

impl LessonPipeline {
    pub fn new(config: &Config, model: Arc<dyn ModelApi>) -> Self {
        Self {
            model,
            compose: PipelineProfile::compose(config),
            iterate: PipelineProfile::iterate(config),
            summarize: PipelineProfile::summarize(config),
            default_duration_min: config.default_duration_min,
            max_detail_chars: config.max_detail_chars,
        }
    }

    pub fn model(&self) -> &Arc<dyn ModelApi> {
        &self.model
    }

    pub async fn compose(&self, request: &LessonRequest) -> Result<NormalizedLesson, PipelineError> {
        let span = tracing::info_span!(
            "compose",
            request_id = %Uuid::new_v4(),
            topic = %request.topic,
            level = %request.level,
            locale = %request.locale
        );
        async {
            let prompt = self.compose.template.render(request);
            let reply = self.call(&self.compose, prompt).await?;
            let value = self.recover(&reply)?;
            let seed = request.meta_seed(self.default_duration_min);
            normalize_lesson(&value, &seed).map_err(|s| self.schema_failure(s, &reply))
        }
        .instrument(span)
        .await
    }

    /// Returns the recovered object; it must carry an `addon` object.
    pub async fn iterate(&self, request: &IterateRequest) -> Result<Value, PipelineError> {
        let span = tracing::info_span!(
            "iterate",
            request_id = %Uuid::new_v4(),
            action = request.action.as_str()
        );
        async {
            let prompt = self.iterate.template.render_iterate(
                &request.song_plan,
                request.action,
                request.context.as_deref(),
            );
            let reply = self.call(&self.iterate, prompt).await?;
            let value = self.recover(&reply)?;
            match value.get("addon") {
                Some(Value::Object(_)) => Ok(value),
                _ => Err(PipelineError::SchemaValidationFailed {
                    reason: "reply has no \"addon\" object".to_string(),
                    raw: truncate(&reply.raw_text(), self.max_detail_chars),
                }),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<Wrapup, PipelineError> {
        let span = tracing::info_span!("summarize", request_id = %Uuid::new_v4());
        async {
            let prompt = self
                .summarize
                .template
                .render_summarize(&request.song_plan, &request.user_answers);
            let reply = self.call(&self.summarize, prompt).await?;
            let value = self.recover(&reply)?;
            normalize_wrapup(&value).map_err(|s| self.schema_failure(s, &reply))
        }
        .instrument(span)
        .await
    }

    async fn call(
        &self,
        profile: &PipelineProfile,
        prompt: Prompt,
    ) -> Result<UpstreamReply, PipelineError> {
        let request = profile.request_for(prompt);
        let started = Instant::now();
        let reply = self.model.generate(&request).await.map_err(|e| {
            warn!(profile = profile.name, error = %e, "upstream call failed");
            PipelineError::from(e)
        })?;
        info!(
            profile = profile.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            model = %reply.model,
            "upstream replied"
        );
        Ok(reply)
    }

    fn recover(&self, reply: &UpstreamReply) -> Result<Value, PipelineError> {
        let recovered = match &reply.content {
            ModelContent::Structured(Value::String(inner)) => recover_json(inner),
            ModelContent::Structured(value) => Ok(value.clone()),
            ModelContent::Text(text) => recover_json(text),
        };
        recovered.map_err(|NotJson(reason)| {
            let raw = reply.raw_text();
            debug!(reason = %reason, raw_len = raw.len(), "recovery failed");
            PipelineError::ModelOutputNotJson {
                reason,
                raw: truncate(&raw, self.max_detail_chars),
            }
        })
    }

    fn schema_failure(&self, shortfall: Shortfall, reply: &UpstreamReply) -> PipelineError {
        warn!(reason = %shortfall, "reply failed validation");
        PipelineError::SchemaValidationFailed {
            reason: shortfall.to_string(),
            raw: truncate(&reply.raw_text(), self.max_detail_chars),
        }
    }
}
