//! Extraction strategies and the ordered strategy runner.
//!
//! Each extractor turns a source (URL, file, buffer) into plain text. Per
//! input kind, strategies run sequentially: a failure logs a structured
//! event and advances to the next; a success runs the cleaner, the
//! content-loss guard, and the validator before being accepted.

pub mod browser;
pub mod document;
pub mod image;
pub mod media;
pub mod web;
pub mod youtube;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::core::error::AuditError;
use crate::core::services::Services;
use crate::core::types::{ContentFormat, SourceType};
use crate::fetch::Fetcher;
use crate::text::validate::{self, Verdict};
use crate::text::clean;

/// Output of one successful extraction strategy.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub method: String,
    pub source_type: SourceType,
    pub content_format: ContentFormat,
    /// Metadata-only degradation: exempt from minimum-length rules.
    pub metadata_only: bool,
}

impl Extraction {
    pub fn new(
        text: String,
        method: &str,
        source_type: SourceType,
        content_format: ContentFormat,
    ) -> Self {
        Self {
            text,
            method: method.to_string(),
            source_type,
            content_format,
            metadata_only: false,
        }
    }
}

/// Everything an extractor may need for one attempt. Single source per
/// request; unused fields stay `None`.
pub struct ExtractCtx<'a> {
    pub services: &'a Services,
    pub cancel: CancellationToken,
    pub workdir: &'a Path,
    pub url: Option<Url>,
    pub bytes: Option<&'a [u8]>,
    pub filename: Option<&'a str>,
    pub mime: Option<&'a str>,
}

impl<'a> ExtractCtx<'a> {
    pub fn for_url(
        services: &'a Services,
        cancel: CancellationToken,
        workdir: &'a Path,
        url: Url,
    ) -> Self {
        Self {
            services,
            cancel,
            workdir,
            url: Some(url),
            bytes: None,
            filename: None,
            mime: None,
        }
    }

    pub fn for_bytes(
        services: &'a Services,
        cancel: CancellationToken,
        workdir: &'a Path,
        bytes: &'a [u8],
        filename: Option<&'a str>,
        mime: Option<&'a str>,
    ) -> Self {
        Self {
            services,
            cancel,
            workdir,
            url: None,
            bytes: Some(bytes),
            filename,
            mime,
        }
    }

    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(self.services.http.clone(), self.services.config.clone())
    }

    pub fn require_url(&self) -> Result<&Url, AuditError> {
        self.url
            .as_ref()
            .ok_or_else(|| AuditError::InputInvalid("extractor requires a URL source".to_string()))
    }

    pub fn require_bytes(&self) -> Result<&[u8], AuditError> {
        self.bytes
            .ok_or_else(|| AuditError::InputInvalid("extractor requires a byte source".to_string()))
    }
}

/// One extraction strategy.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Total wall-clock budget for one attempt. Exceeding it is a failure,
    /// not a crash.
    fn budget(&self) -> Duration {
        Duration::from_secs(90)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError>;
}

/// A successful extraction after cleaning and validation.
#[derive(Debug, Clone)]
pub struct CleanedExtraction {
    pub extraction: Extraction,
    pub cleaned: String,
    pub verdict: Verdict,
}

/// Run `strategies` in order until one yields usable text.
///
/// Failures advance to the next strategy; cancellation stops the run
/// immediately. A success whose cleaned text trips the content-loss guard
/// or lands under the minimum strategy length (metadata-only excepted) is
/// recorded and skipped. When the list runs dry, the last error is
/// surfaced as `ExtractionExhausted`.
pub async fn run_strategies(
    strategies: &[Box<dyn Extractor>],
    ctx: &ExtractCtx<'_>,
) -> Result<CleanedExtraction, AuditError> {
    let min_chars = ctx.services.config.min_strategy_chars;
    let mut last_error = "no strategies configured".to_string();

    for strategy in strategies {
        if ctx.cancel.is_cancelled() {
            return Err(AuditError::Cancelled);
        }

        let attempt = tokio::time::timeout(strategy.budget(), strategy.extract(ctx)).await;
        let extraction = match attempt {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(AuditError::Cancelled)) => return Err(AuditError::Cancelled),
            Ok(Err(e)) => {
                warn!(
                    event = "extraction_strategy_failed",
                    method = strategy.name(),
                    status = e.http_status(),
                    message = %e,
                );
                last_error = format!("{}: {e}", strategy.name());
                continue;
            }
            Err(_) => {
                warn!(
                    event = "extraction_strategy_timeout",
                    method = strategy.name(),
                    budget_secs = strategy.budget().as_secs(),
                );
                last_error = format!("{}: budget exceeded", strategy.name());
                continue;
            }
        };

        let cleaned = clean::clean(&extraction.text);

        if let Err(e) = validate::enforce_content_loss_guard(&extraction.text, &cleaned) {
            warn!(
                event = "extraction_content_loss",
                method = strategy.name(),
                message = %e,
            );
            last_error = format!("{}: {e}", strategy.name());
            continue;
        }

        // Metadata-only degradations answer to the lower floor; everything
        // else must clear the per-strategy minimum.
        let floor = if extraction.metadata_only {
            ctx.services.config.min_cleaned
        } else {
            min_chars
        };
        if cleaned.chars().count() < floor {
            info!(
                event = "extraction_too_short",
                method = strategy.name(),
                chars = cleaned.chars().count(),
            );
            last_error = format!(
                "{}: extracted only {} chars",
                strategy.name(),
                cleaned.chars().count()
            );
            continue;
        }

        let verdict = validate::validate(&cleaned);
        if !verdict.is_valid {
            // Advisory: proceed with what we have, the reasoner sees a
            // best-effort flag through the validator warnings.
            info!(
                event = "extraction_below_validator_thresholds",
                method = strategy.name(),
                reasons = ?verdict.reasons,
            );
        }
        info!(
            event = "extraction_succeeded",
            method = strategy.name(),
            chars = cleaned.chars().count(),
        );

        return Ok(CleanedExtraction {
            extraction,
            cleaned,
            verdict,
        });
    }

    Err(AuditError::ExtractionExhausted { last: last_error })
}
