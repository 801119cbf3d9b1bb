//! English translation pass for Hindi and mixed-script content.
//!
//! Runs before claim reduction so the reasoner and the reducer both see an
//! English rendering. Failure is non-fatal: the pipeline proceeds without a
//! translation.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::error::AuditError;
use crate::core::services::{GenerationConfig, ReasonRequest, Services};
use crate::core::types::Language;
use crate::reason::prompt;
use crate::reason::router::ModelRouter;

/// At most this many characters are translated.
const MAX_TRANSLATION_CHARS: usize = 10_000;

/// Translate `text` to English. Returns `None` on any failure; the caller
/// treats a missing translation as "proceed with the original".
pub async fn translate(
    services: &Services,
    text: &str,
    language: &Language,
    cancel: &CancellationToken,
) -> Result<Option<String>, AuditError> {
    if !language.needs_translation() {
        return Ok(None);
    }

    let bounded: String = text.chars().take(MAX_TRANSLATION_CHARS).collect();
    let config = &services.config;
    let router = ModelRouter::new(
        config.models.clone(),
        config.short_threshold,
        config.long_threshold,
    );

    let request = ReasonRequest {
        model: router.translation_model(),
        system: prompt::translation_prompt(language.code()),
        user: bounded,
        config: GenerationConfig::translation(),
    };

    let deadline = config.reasoner_timeout;
    let outcome = tokio::select! {
        res = tokio::time::timeout(deadline, services.reasoner.generate(&request)) => match res {
            Ok(inner) => inner,
            Err(_) => Err(AuditError::ReasonerTimeout),
        },
        _ = cancel.cancelled() => return Err(AuditError::Cancelled),
    };

    match outcome {
        Ok(translated) if !translated.trim().is_empty() => Ok(Some(translated)),
        Ok(_) => {
            warn!("translator returned empty output; continuing untranslated");
            Ok(None)
        }
        Err(e) => {
            warn!("translation failed ({e}); continuing untranslated");
            Ok(None)
        }
    }
}
