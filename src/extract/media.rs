//! Speech-to-text extraction over audio/video buffers.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::{ExtractCtx, Extraction, Extractor};

/// Run the shared transcriber under the configured deadline.
pub async fn transcribe_with_deadline(
    ctx: &ExtractCtx<'_>,
    audio: &[u8],
    mime: &str,
) -> Result<String, AuditError> {
    let deadline = ctx.services.config.transcribe_timeout;
    let transcribe = ctx.services.transcriber.transcribe(audio, mime);

    let text = tokio::select! {
        res = tokio::time::timeout(deadline, transcribe) => match res {
            Ok(inner) => inner?,
            Err(_) => return Err(AuditError::FetchTimeout(deadline)),
        },
        _ = ctx.cancel.cancelled() => return Err(AuditError::Cancelled),
    };

    if text.trim().is_empty() {
        return Err(AuditError::ContentTooShort { len: 0 });
    }
    Ok(text)
}

/// Transcribes the context's byte source: uploaded audio/video files, or a
/// media URL body the pipeline already fetched.
pub struct TranscribeAudio {
    source_type: SourceType,
}

impl TranscribeAudio {
    /// For uploaded audio/video files.
    pub fn upload() -> Self {
        Self {
            source_type: SourceType::Upload,
        }
    }

    /// For media fetched from a direct URL.
    pub fn media() -> Self {
        Self {
            source_type: SourceType::Media,
        }
    }
}

#[async_trait]
impl Extractor for TranscribeAudio {
    fn name(&self) -> &'static str {
        "transcribe"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(180 + 10)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let bytes = ctx.require_bytes()?;
        if bytes.is_empty() {
            return Err(AuditError::InputInvalid("empty media payload".to_string()));
        }
        let mime = ctx.mime.unwrap_or("audio/mpeg");

        info!(size = bytes.len(), mime, "transcribing media payload");
        let text = transcribe_with_deadline(ctx, bytes, mime).await?;

        Ok(Extraction::new(
            text,
            self.name(),
            self.source_type,
            ContentFormat::Speech,
        ))
    }
}
