//! OCR extraction for uploaded images.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::{ExtractCtx, Extraction, Extractor};

pub struct ImageOcr;

#[async_trait]
impl Extractor for ImageOcr {
    fn name(&self) -> &'static str {
        "image_ocr"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(120)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let bytes = ctx.require_bytes()?;
        if bytes.is_empty() {
            return Err(AuditError::InputInvalid("empty image payload".to_string()));
        }
        let languages = &ctx.services.config.ocr_languages;

        let text = ctx
            .services
            .ocr
            .recognize_image(bytes, languages, &ctx.cancel)
            .await?;

        if text.trim().is_empty() {
            return Err(AuditError::ContentTooShort { len: 0 });
        }
        info!(chars = text.len(), "image OCR produced text");

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Upload,
            ContentFormat::Article,
        ))
    }
}
