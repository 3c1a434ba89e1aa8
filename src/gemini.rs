use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{config::Config, error::PipelineError, models::InlineMedia};

/// Which kind of outbound call is being made. Selects the model and the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Analysis,
    Summary,
    Synthesis,
}

impl CallKind {
    fn label(self) -> &'static str {
        match self {
            CallKind::Analysis => "analysis",
            CallKind::Summary => "summary",
            CallKind::Synthesis => "synthesis",
        }
    }
}

/// One decoded part of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    Text(String),
    /// Inline binary data, still base64 encoded as received.
    Media { mime_type: String, data: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub parts: Vec<ReplyPart>,
}

impl ModelReply {
    /// All non-blank text parts, joined by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ReplyPart::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First part that carries image data, scanning every part in order.
    pub fn first_image(&self) -> Option<(&str, &str)> {
        self.parts.iter().find_map(|p| match p {
            ReplyPart::Media { mime_type, data } if mime_type.starts_with("image/") && !data.is_empty() => {
                Some((mime_type.as_str(), data.as_str()))
            }
            _ => None,
        })
    }
}

/// Boundary to the multimodal inference service. One call, one attempt.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(
        &self,
        kind: CallKind,
        instruction: &str,
        media: Option<&InlineMedia>,
    ) -> Result<ModelReply, PipelineError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    analysis_timeout: Duration,
    synthesis_timeout: Duration,
    shutdown: CancellationToken,
}

impl GeminiClient {
    /// Calls made through this client are abandoned when `shutdown` is cancelled.
    pub fn new(config: &Config, shutdown: CancellationToken) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            analysis_timeout: config.analysis_timeout,
            synthesis_timeout: config.synthesis_timeout,
            shutdown,
        }
    }

    fn model_for(&self, kind: CallKind) -> &str {
        match kind {
            CallKind::Analysis | CallKind::Summary => &self.text_model,
            CallKind::Synthesis => &self.image_model,
        }
    }

    fn deadline_for(&self, kind: CallKind) -> Duration {
        match kind {
            CallKind::Analysis | CallKind::Summary => self.analysis_timeout,
            CallKind::Synthesis => self.synthesis_timeout,
        }
    }

    fn build_request_body(kind: CallKind, instruction: &str, media: Option<&InlineMedia>) -> Value {
        let mut parts = vec![json!({ "text": instruction })];
        if let Some(media) = media {
            parts.push(json!({
                "inlineData": {
                    "mimeType": media.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&media.bytes),
                }
            }));
        }

        let generation_config = match kind {
            CallKind::Synthesis => json!({
                "responseModalities": ["TEXT", "IMAGE"],
                "temperature": 0.4,
                "topP": 0.95,
                "topK": 64,
                "candidateCount": 1
            }),
            // No output cap: 2.5 models bill thinking against it and can return no text at all.
            CallKind::Analysis | CallKind::Summary => json!({
                "responseMimeType": "application/json",
                "temperature": 0.2,
                "topP": 0.95,
                "topK": 40
            }),
        };

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config
        })
    }

    async fn perform_api_call(&self, model: &str, body: &Value, deadline: Duration) -> Result<ModelReply, PipelineError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        info!("🔗 Making request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(e, deadline))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(PipelineError::Upstream { status: status.as_u16(), body: error_body });
        }

        let response_text = response.text().await.map_err(|e| classify_transport(e, deadline))?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let logged = match serde_json::from_str::<Value>(&response_text) {
                Ok(mut value) => {
                    truncate_base64_in_json(&mut value);
                    value.to_string()
                }
                Err(_) => response_text.chars().take(1000).collect(),
            };
            debug!("📥 Raw Gemini API response: {}", logged);
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            warn!("⚠️ Could not decode Gemini response envelope: {}", e);
            PipelineError::MalformedResponse
        })?;
        Ok(parsed.into_reply())
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn invoke(
        &self,
        kind: CallKind,
        instruction: &str,
        media: Option<&InlineMedia>,
    ) -> Result<ModelReply, PipelineError> {
        let model = self.model_for(kind);
        let deadline = self.deadline_for(kind);
        let body = Self::build_request_body(kind, instruction, media);
        info!(call = kind.label(), model, with_media = media.is_some(), "Invoking Gemini");

        let token = self.shutdown.child_token();
        let timer = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(deadline).await;
                token.cancel();
            }
        });

        let result = tokio::select! {
            result = self.perform_api_call(model, &body, deadline) => result,
            _ = token.cancelled() => {
                warn!(call = kind.label(), "⏱️ Gemini call abandoned after {:?}", deadline);
                Err(PipelineError::Timeout { after: deadline })
            }
        };
        timer.abort();

        match &result {
            Ok(reply) => info!(call = kind.label(), parts = reply.parts.len(), "✅ Gemini call finished"),
            Err(e) => error!(call = kind.label(), kind = e.kind(), "❌ Gemini call failed: {}", e),
        }
        result
    }
}

fn classify_transport(err: reqwest::Error, deadline: Duration) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Timeout { after: deadline }
    } else {
        PipelineError::Connection(err.without_url().to_string())
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

impl GeminiResponse {
    fn into_reply(self) -> ModelReply {
        let parts = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .filter_map(|c| c.parts)
            .flatten()
            .filter_map(decode_part)
            .collect();
        ModelReply { parts }
    }
}

// Parts are decoded one by one so a single odd part cannot sink the whole reply.
fn decode_part(raw: Value) -> Option<ReplyPart> {
    if let Some(inline) = raw.get("inlineData").or_else(|| raw.get("inline_data")) {
        let inline: InlineData = serde_json::from_value(inline.clone()).ok()?;
        let data = inline.data.filter(|d| !d.is_empty())?;
        let mime_type = inline.mime_type.unwrap_or_else(|| "application/octet-stream".to_string());
        info!("🎯 Found inline data with mime type: {}", mime_type);
        return Some(ReplyPart::Media { mime_type, data });
    }
    match raw.get("text") {
        Some(Value::String(text)) => Some(ReplyPart::Text(text.clone())),
        _ => {
            debug!("Skipping unrecognised reply part");
            None
        }
    }
}
