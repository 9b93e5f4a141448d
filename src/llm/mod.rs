//! The upstream language-model collaborator.

pub mod client;
pub mod models;

pub use client::OpenAiClient;
pub use models::{ModelContent, ProbeReply, UpstreamReply, Usage};

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// Output shape requested from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    JsonObject,
    JsonSchema { name: String, schema: Value },
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub format: OutputFormat,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingCredentials,
    #[error("could not reach the model API: {0}")]
    Network(String),
    #[error("model API timed out after {0}ms")]
    Timeout(u64),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable model API response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// HTTP status to surface to our own caller.
    pub fn status_code(&self) -> u16 {
        match self {
            UpstreamError::MissingCredentials => 503,
            UpstreamError::Network(_) | UpstreamError::Decode(_) => 502,
            UpstreamError::Timeout(_) => 504,
            UpstreamError::Status { status, .. } if (400..=599).contains(status) => *status,
            UpstreamError::Status { .. } => 502,
        }
    }

    /// Diagnostic text; for status failures this is the (already truncated) body.
    pub fn detail(&self) -> String {
        match self {
            UpstreamError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Anything that can run a generation request. The service uses
/// [`OpenAiClient`]; tests substitute canned replies.
pub trait ModelApi: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<UpstreamReply, UpstreamError>>;

    /// Minimal round trip used by the debug endpoint.
    fn probe(&self) -> BoxFuture<'_, Result<ProbeReply, UpstreamError>>;

    fn has_credentials(&self) -> bool;
}
