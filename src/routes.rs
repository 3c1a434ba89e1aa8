use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    catalog::OptionCatalogs,
    error::PipelineError,
    models::{AttributeField, AttributeRecord, InlineMedia, MoodboardRequest, MoodboardResponse, RequestContext, SummaryResponse},
    pipeline::Pipeline,
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/options", get(get_options))
        .route("/api/analyze-image", post(analyze_image))
        .route("/api/summary", post(summarize))
        .route("/api/moodboard", post(generate_moodboard))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Failure returned to HTTP callers. Upstream bodies stay in the logs.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Request body refused while extracting it; keeps the status axum chose.
    Rejected { status: StatusCode, message: String },
    Pipeline(PipelineError),
}

pub struct Failure {
    request_id: Uuid,
    error: ApiError,
}

impl Failure {
    fn new(request_id: Uuid, error: impl Into<ApiError>) -> Self {
        Self { request_id, error: error.into() }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Rejected { status: err.status(), message: format!("invalid multipart body: {}", err.body_text()) }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
    }
}

fn rejection_kind(status: StatusCode) -> &'static str {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        _ => "bad_request",
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Upstream { .. }
        | PipelineError::MalformedResponse
        | PipelineError::Parse(_)
        | PipelineError::EmptyResult { .. }
        | PipelineError::NoImageProduced => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self.error {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message.clone()),
            ApiError::Rejected { status, message } => (*status, rejection_kind(*status), message.clone()),
            ApiError::Pipeline(err) => (status_for(err), err.kind(), err.to_string()),
        };
        warn!(request_id = %self.request_id, kind, "Request failed: {}", message);
        if let ApiError::Pipeline(PipelineError::Upstream { body, .. }) = &self.error {
            debug!(request_id = %self.request_id, "Upstream body: {}", body);
        }
        let body = json!({ "error": kind, "message": message, "requestId": self.request_id });
        (status, Json(body)).into_response()
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_options(State(state): State<AppState>) -> Json<OptionCatalogs> {
    Json(*state.pipeline.catalogs())
}

pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AttributeRecord>, Failure> {
    let request_id = Uuid::new_v4();
    run_analysis(&state, multipart)
        .instrument(info_span!("analyze_image", %request_id))
        .await
        .map(Json)
        .map_err(|e| Failure::new(request_id, e))
}

async fn run_analysis(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AttributeRecord, ApiError> {
    let image = read_upload(multipart?)
        .await?
        .image
        .ok_or_else(|| ApiError::BadRequest("missing 'image' field".into()))?;
    let record = state.pipeline.analyze_image(&image).await?;
    info!("✅ Image analysed");
    Ok(record)
}

pub async fn summarize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, Failure> {
    let request_id = Uuid::new_v4();
    run_summary(&state, multipart)
        .instrument(info_span!("summarize", %request_id))
        .await
        .map(Json)
        .map_err(|e| Failure::new(request_id, e))
}

async fn run_summary(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<SummaryResponse, ApiError> {
    let upload = read_upload(multipart?).await?;
    let ctx = RequestContext { image: upload.image, hints: upload.hints, ..Default::default() };
    let outcome = state.pipeline.summarize(&ctx).await?;
    info!("✅ Summary generated ({} chars)", outcome.summary.len());
    Ok(SummaryResponse { summary: outcome.summary, attributes: outcome.attributes })
}

pub async fn generate_moodboard(
    State(state): State<AppState>,
    body: Result<Json<MoodboardRequest>, JsonRejection>,
) -> Result<Json<MoodboardResponse>, Failure> {
    let request_id = Uuid::new_v4();
    let Json(body) = body.map_err(|e| Failure::new(request_id, e))?;
    let outcome = state
        .pipeline
        .moodboard(&body.attributes, &body.overrides)
        .instrument(info_span!("generate_moodboard", %request_id))
        .await
        .map_err(|e| Failure::new(request_id, e))?;

    Ok(Json(MoodboardResponse {
        image_base64: outcome.image_base64,
        mime_type: outcome.mime_type,
        prompt: outcome.directive.to_string(),
        generated_at: Utc::now(),
    }))
}

// --- Upload handling ---

#[derive(Debug, Default)]
struct Upload {
    image: Option<InlineMedia>,
    hints: AttributeRecord,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let declared = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            let mime_type = resolve_media_type(declared.as_deref(), &bytes)?;
            upload.image = Some(InlineMedia { mime_type, bytes });
        } else if let Some(hint) = AttributeField::from_key(&name) {
            let value = field.text().await?;
            upload.hints = upload.hints.with(hint, value);
        } else {
            debug!("Ignoring unknown form field '{}'", name);
        }
    }
    Ok(upload)
}

/// Picks the media type sent upstream: the declared type when it names an image,
/// otherwise whatever the bytes look like.
fn resolve_media_type(declared: Option<&str>, bytes: &Bytes) -> Result<String, ApiError> {
    if let Some(declared) = declared {
        let lowered = declared.trim().to_ascii_lowercase();
        if lowered == "image/jpg" {
            return Ok("image/jpeg".to_string());
        }
        if lowered.starts_with("image/") {
            return Ok(lowered);
        }
    }
    match image::guess_format(bytes) {
        Ok(format) => Ok(format.to_mime_type().to_string()),
        Err(e) => {
            warn!("Could not determine uploaded image type: {}", e);
            Err(ApiError::BadRequest("unsupported image type".into()))
        }
    }
}
