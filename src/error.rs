use std::time::Duration;
use thiserror::Error;

/// Every failure the extraction and synthesis pipeline can surface.
///
/// Each stage classifies its failure into exactly one variant. Upstream bodies are kept
/// for diagnostics only and are not part of the `Display` text.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("inference call exceeded its {}s deadline", .after.as_secs_f32())]
    Timeout { after: Duration },

    #[error("could not reach the inference service: {0}")]
    Connection(String),

    #[error("inference service returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("model reply did not contain a JSON object")]
    MalformedResponse,

    #[error("model reply was not valid JSON: {0}")]
    Parse(String),

    #[error("model reply was too short to use ({len} chars)")]
    EmptyResult { len: usize },

    #[error("image generation returned no image data")]
    NoImageProduced,
}

impl PipelineError {
    /// Stable code reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Connection(_) => "connection",
            PipelineError::Upstream { .. } => "upstream",
            PipelineError::MalformedResponse => "malformed_response",
            PipelineError::Parse(_) => "parse_error",
            PipelineError::EmptyResult { .. } => "empty_result",
            PipelineError::NoImageProduced => "no_image_produced",
        }
    }
}
