use std::sync::Arc;

use crate::config::Config;
use crate::llm::ModelApi;
use crate::pipeline::LessonPipeline;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub(crate) pipeline: Arc<LessonPipeline>,
}

impl AppState {
    pub fn new(config: &Config, model: Arc<dyn ModelApi>) -> Self {
        Self {
            pipeline: Arc::new(LessonPipeline::new(config, model)),
        }
    }

    pub(crate) fn model(&self) -> &Arc<dyn ModelApi> {
        self.pipeline.model()
    }
}
