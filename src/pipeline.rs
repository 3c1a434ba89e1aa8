use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::{normalize_record, OptionCatalogs},
    error::PipelineError,
    gemini::{CallKind, ModelGateway},
    models::{AttributeOverrides, AttributeRecord, Directive, InlineMedia, RequestContext},
    prompt, resolve, sanitize,
};

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    pub attributes: AttributeRecord,
}

#[derive(Debug, Clone)]
pub struct MoodboardOutcome {
    pub image_base64: String,
    pub mime_type: String,
    pub directive: Directive,
}

/// Sequences gateway, sanitizer, resolver, normalizer and synthesizer for each call shape.
/// Holds no per-call state; one instance serves every request.
pub struct Pipeline {
    gateway: Arc<dyn ModelGateway>,
    catalogs: OptionCatalogs,
}

impl Pipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>, catalogs: OptionCatalogs) -> Self {
        Self { gateway, catalogs }
    }

    pub fn catalogs(&self) -> &OptionCatalogs {
        &self.catalogs
    }

    async fn extract(
        &self,
        kind: CallKind,
        instruction: &str,
        media: Option<&InlineMedia>,
    ) -> Result<AttributeRecord, PipelineError> {
        let reply = self.gateway.invoke(kind, instruction, media).await?;
        let text = reply.text();
        let usable = sanitize::ensure_usable(&text)?;
        let json = sanitize::sanitize(usable)?;
        sanitize::parse(&json)
    }

    /// Pulls attributes out of a photo alone.
    pub async fn analyze_image(&self, image: &InlineMedia) -> Result<AttributeRecord, PipelineError> {
        info!("🎯 Analysing {} image ({} bytes)", image.mime_type, image.bytes.len());
        let instruction = prompt::analysis_instruction(&self.catalogs);
        let extracted = self.extract(CallKind::Analysis, &instruction, Some(image)).await?;
        Ok(normalize_record(&extracted, &self.catalogs))
    }

    /// Combines user hints with an optional photo. Extraction is primary; a hint fills
    /// any field the model left empty.
    pub async fn summarize(&self, ctx: &RequestContext) -> Result<SummaryOutcome, PipelineError> {
        info!("🎯 Summarising hints (image: {})", ctx.image.is_some());
        let instruction = prompt::summary_instruction(&ctx.hints, ctx.image.is_some(), &self.catalogs);
        let extracted = self.extract(CallKind::Summary, &instruction, ctx.image.as_ref()).await?;

        let merged = resolve::merge(&extracted, &ctx.hints, &ctx.overrides.to_record());
        let attributes = normalize_record(&merged, &self.catalogs);
        Ok(SummaryOutcome { summary: attributes.summary.clone(), attributes })
    }

    /// Renders the directive for a full record (plus any overrides) and relays the image.
    pub async fn moodboard(
        &self,
        record: &AttributeRecord,
        overrides: &AttributeOverrides,
    ) -> Result<MoodboardOutcome, PipelineError> {
        let merged = resolve::merge(record, &AttributeRecord::default(), &overrides.to_record());
        let attributes = normalize_record(&merged, &self.catalogs);
        let directive = prompt::synthesize(&attributes);
        info!(
            "🎯 Generating moodboard for '{}' / '{}' ({} char prompt)",
            attributes.room_type,
            attributes.aesthetic_style,
            directive.as_str().len()
        );

        let reply = self.gateway.invoke(CallKind::Synthesis, directive.as_str(), None).await?;
        let (mime_type, data) = reply.first_image().ok_or_else(|| {
            let text = reply.text();
            info!("⚠️ Image model answered with text only: {}", text.chars().take(200).collect::<String>());
            PipelineError::NoImageProduced
        })?;
        info!("✅ Moodboard image received ({}, {} base64 chars)", mime_type, data.len());

        Ok(MoodboardOutcome {
            image_base64: data.to_string(),
            mime_type: mime_type.to_string(),
            directive,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGateway;
    use super::*;
    use crate::gemini::{ModelReply, ReplyPart};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn photo() -> InlineMedia {
        InlineMedia { mime_type: "image/jpeg".into(), bytes: Bytes::from_static(b"\xff\xd8\xff") }
    }

    fn pipeline(gateway: Arc<ScriptedGateway>) -> Pipeline {
        Pipeline::new(gateway, OptionCatalogs::STANDARD)
    }

    #[tokio::test]
    async fn analysis_returns_normalized_record() {
        let gateway = ScriptedGateway::text(
            "```json\n{\"roomType\": \"living room\", \"aestheticStyle\": \"Eclectic boho mix\", \"colorPalette\": \"Green, Brown\"}\n```",
        );
        let record = pipeline(gateway.clone()).analyze_image(&photo()).await.unwrap();

        assert_eq!(record.room_type, "Living Room");
        assert_eq!(record.aesthetic_style, "Eclectic");
        assert_eq!(record.color_palette, "Green, Brown");
        assert_eq!(record.notes, "");

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CallKind::Analysis);
        assert_eq!(calls[0].2.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn analysis_surfaces_classified_failures() {
        let gateway = ScriptedGateway::text("Sorry, I cannot help with that image.");
        let err = pipeline(gateway).analyze_image(&photo()).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse));

        let gateway = ScriptedGateway::text("{}");
        let err = pipeline(gateway).analyze_image(&photo()).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult { .. }));

        let gateway = ScriptedGateway::replying(Ok(ModelReply::default()));
        let err = pipeline(gateway).analyze_image(&photo()).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult { len: 0 }));
    }

    #[tokio::test]
    async fn timeout_is_never_reported_as_a_record() {
        let gateway = ScriptedGateway::replying(Err(PipelineError::Timeout { after: Duration::from_secs(30) }));
        let err = pipeline(gateway).analyze_image(&photo()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn summary_uses_hints_as_fallback() {
        let gateway = ScriptedGateway::text(
            r#"{"summary": "A warm, plant-filled balcony.", "roomType": "Balcony", "aestheticStyle": "", "themeMood": "relaxed"}"#,
        );
        let ctx = RequestContext {
            hints: AttributeRecord {
                room_type: "Patio".into(),
                aesthetic_style: "bohemian style".into(),
                notes: "needs shade".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let outcome = pipeline(gateway.clone()).summarize(&ctx).await.unwrap();

        assert_eq!(outcome.summary, "A warm, plant-filled balcony.");
        assert_eq!(outcome.attributes.room_type, "Balcony");
        assert_eq!(outcome.attributes.aesthetic_style, "Bohemian");
        assert_eq!(outcome.attributes.notes, "needs shade");
        assert_eq!(outcome.attributes.theme_mood, "relaxed");
        assert!(gateway.last_instruction().contains("- Additional notes: needs shade"));
    }

    #[tokio::test]
    async fn moodboard_applies_overrides_and_relays_first_image() {
        let gateway = ScriptedGateway::replying(Ok(ModelReply {
            parts: vec![
                ReplyPart::Text("Here you go".into()),
                ReplyPart::Media { mime_type: "image/png".into(), data: "iVBORw0KGgo".into() },
                ReplyPart::Media { mime_type: "image/png".into(), data: "second".into() },
            ],
        }));
        let record = AttributeRecord {
            room_type: "Balcony".into(),
            aesthetic_style: "Boho".into(),
            color_palette: "Green, Brown".into(),
            ..Default::default()
        };
        let overrides = AttributeOverrides { aesthetic_style: Some("Luxury".into()), ..Default::default() };
        let outcome = pipeline(gateway.clone()).moodboard(&record, &overrides).await.unwrap();

        assert_eq!(outcome.image_base64, "iVBORw0KGgo");
        assert_eq!(outcome.mime_type, "image/png");
        assert!(outcome.directive.as_str().contains("\"Luxury Moodboard\""));
        assert!(!outcome.directive.as_str().contains("Boho"));
        assert_eq!(gateway.last_instruction(), outcome.directive.as_str());
        assert_eq!(gateway.calls.lock().unwrap()[0].0, CallKind::Synthesis);
    }

    #[tokio::test]
    async fn text_only_moodboard_reply_is_no_image() {
        let gateway = ScriptedGateway::text("I would describe this moodboard as...");
        let record = AttributeRecord { room_type: "Kitchen".into(), ..Default::default() };
        let err = pipeline(gateway).moodboard(&record, &AttributeOverrides::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoImageProduced));
    }
}
