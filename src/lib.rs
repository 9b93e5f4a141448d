//! songplan library crate
//!
//! Turns a learning topic into a validated SONG lesson by way of an upstream
//! language model, recovering JSON from whatever the model sends back.
//! Exposed as a library so the binary, integration tests and benchmarks share
//! one pipeline.

pub mod config;
pub mod error;
pub mod lesson;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod recover;
pub mod request;
pub mod server;
pub mod util;

pub use config::Config;
pub use error::{ErrorBody, ErrorCode, PipelineError};
pub use pipeline::LessonPipeline;
