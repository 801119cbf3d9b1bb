//! The audit pipeline: one input in, one canonical report out.
//!
//! Stage order is fixed: fingerprint → rules → extraction → metadata →
//! translation → claim reduction → reasoner → normalization → persistence.
//! Recoverable reasoner failures become a structured shell report; only
//! input/auth errors and extraction exhaustion surface to the caller.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::core::error::AuditError;
use crate::core::services::Services;
use crate::core::types::{
    AuditOptions, AuditRecord, ContentFormat, ExtractedContent, Input, Kind, Report, SourceType,
};
use crate::extract::{self, browser, document, image, media, web, youtube, ExtractCtx, Extractor};
use crate::fetch::Fetcher;
use crate::fingerprint;
use crate::reason::{self, AnalysisRequest};
use crate::text::{claims, language};

/// How much of the original input is persisted alongside the report.
const MAX_STORED_INPUT_CHARS: usize = 2_000;

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub id: String,
    pub report: Report,
}

pub struct Pipeline {
    services: Services,
}

impl Pipeline {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run one audit end to end.
    pub async fn audit(
        &self,
        input: Input,
        options: AuditOptions,
        cancel: CancellationToken,
    ) -> Result<AuditOutcome, AuditError> {
        let started = Instant::now();
        let config = &self.services.config;

        if options.user_id.trim().is_empty() {
            return Err(AuditError::Unauthenticated);
        }
        if let Input::Text { body } = &input {
            if body.chars().count() > config.max_text_length {
                return Err(AuditError::TextTooLong {
                    limit: config.max_text_length,
                });
            }
        }
        if let Input::File { bytes, .. } = &input {
            if bytes.len() as u64 > config.max_media_size {
                return Err(AuditError::PayloadTooLarge {
                    limit: config.max_media_size,
                });
            }
        }

        let kind = fingerprint::classify(&input)?;
        info!(kind = kind.as_str(), user = %options.user_id, "audit started");

        let country = if options.jurisdiction.country.trim().is_empty() {
            config.jurisdiction_default.clone()
        } else {
            options.jurisdiction.country.clone()
        };
        let pack = self
            .services
            .rules
            .get(
                &country,
                options.jurisdiction.region.as_deref(),
                &options.category,
            )
            .await;

        // Per-request scratch space; removed on every exit path, including
        // cancellation, when the guard drops.
        let workdir = tempfile::tempdir()
            .map_err(|e| AuditError::Persistence(format!("scratch dir: {e}")))?;

        let mut extracted = self
            .acquire_content(&input, kind, workdir.path(), cancel.clone())
            .await?;

        let meta = language::detect_metadata(
            &extracted.cleaned,
            extracted.source_type,
            extracted.content_format,
            &extracted.extraction_method,
        );
        extracted.language = meta.language.clone();

        extracted.translated = reason::translate::translate(
            &self.services,
            &extracted.cleaned,
            &extracted.language,
            &cancel,
        )
        .await?;

        let reducer_input = extracted
            .translated
            .as_deref()
            .unwrap_or(&extracted.cleaned);
        let reduced = claims::reduce(reducer_input, config.max_content_for_ai);

        let analysis = AnalysisRequest {
            content: &reduced,
            pack: &pack,
            jurisdiction: &options.jurisdiction,
            category: &options.category,
            analysis_mode: &options.analysis_mode,
            metadata: &meta,
        };
        let mut report = reason::analyze(&self.services, &analysis, &cancel).await?;
        report.transcription = reducer_input.to_string();
        report.processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            event = "audit_complete",
            score = report.score,
            status = ?report.status,
            violations = report.violations.len(),
            model = %report.model_used,
            duration_ms = report.processing_time_ms,
        );

        let outcome = AuditOutcome {
            id: uuid::Uuid::new_v4().to_string(),
            report,
        };
        self.persist(&outcome, &input, kind, &options, &extracted)
            .await;

        Ok(outcome)
    }

    /// Acquire extracted content by running the kind's strategy plan.
    async fn acquire_content(
        &self,
        input: &Input,
        kind: Kind,
        workdir: &std::path::Path,
        cancel: CancellationToken,
    ) -> Result<ExtractedContent, AuditError> {
        let config = &self.services.config;

        match (kind, input) {
            (Kind::Text, Input::Text { body }) => Ok(ExtractedContent {
                raw: body.clone(),
                cleaned: body.clone(),
                translated: None,
                source_type: SourceType::Upload,
                content_format: ContentFormat::Article,
                extraction_method: "direct".to_string(),
                language: crate::core::types::Language::Unknown,
                metadata_only: false,
            }),

            (Kind::WebPage, Input::Url { href }) => {
                let url = parse_url(href)?;
                let ctx = ExtractCtx::for_url(&self.services, cancel, workdir, url);
                self.run_plan(self.web_plan(), &ctx).await
            }

            (Kind::YouTube, Input::Url { href }) => {
                let url = parse_url(href)?;
                let ctx = ExtractCtx::for_url(&self.services, cancel, workdir, url);
                let mut plan: Vec<Box<dyn Extractor>> =
                    vec![Box::new(youtube::CaptionTrack), Box::new(youtube::OEmbed)];
                if config.enable_audio_download {
                    plan.push(Box::new(youtube::AudioDownloader));
                }
                self.run_plan(plan, &ctx).await
            }

            (Kind::MediaUrl, Input::Url { href }) => {
                let url = parse_url(href)?;
                let fetcher = Fetcher::new(self.services.http.clone(), config.clone());
                let body = fetcher.get(url.as_str(), &cancel).await.map_err(|e| {
                    if e.is_strategy_local() {
                        AuditError::ExtractionExhausted {
                            last: format!("media fetch: {e}"),
                        }
                    } else {
                        e
                    }
                })?;

                if body.is_html() {
                    // The "media" URL served a page; degrade to the web plan.
                    info!(url = %url, "media URL served HTML, degrading to web page plan");
                    let ctx = ExtractCtx::for_url(&self.services, cancel, workdir, url);
                    return self.run_plan(self.web_plan(), &ctx).await;
                }

                let ctx = ExtractCtx::for_bytes(
                    &self.services,
                    cancel,
                    workdir,
                    &body.bytes,
                    None,
                    Some(&body.mime),
                );
                self.run_plan(vec![Box::new(media::TranscribeAudio::media())], &ctx)
                    .await
            }

            (Kind::Image, Input::File { bytes, filename, mime }) => {
                let ctx = ExtractCtx::for_bytes(
                    &self.services,
                    cancel,
                    workdir,
                    bytes,
                    Some(filename),
                    Some(mime),
                );
                self.run_plan(vec![Box::new(image::ImageOcr)], &ctx).await
            }

            (Kind::Audio | Kind::Video, Input::File { bytes, filename, mime }) => {
                let ctx = ExtractCtx::for_bytes(
                    &self.services,
                    cancel,
                    workdir,
                    bytes,
                    Some(filename),
                    Some(mime),
                );
                self.run_plan(vec![Box::new(media::TranscribeAudio::upload())], &ctx)
                    .await
            }

            (Kind::Document, Input::File { bytes, filename, mime }) => {
                let plan: Vec<Box<dyn Extractor>> = match mime.as_str() {
                    "application/pdf" => vec![Box::new(document::PdfTextThenOcr)],
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                        vec![Box::new(document::DocxText)]
                    }
                    "application/msword" => vec![Box::new(document::DocText)],
                    _ => {
                        // MIME was guessed during fingerprinting; re-guess here.
                        if bytes.starts_with(b"%PDF") {
                            vec![Box::new(document::PdfTextThenOcr)]
                        } else if bytes.starts_with(b"PK") {
                            vec![Box::new(document::DocxText)]
                        } else {
                            vec![Box::new(document::DocText)]
                        }
                    }
                };
                let ctx = ExtractCtx::for_bytes(
                    &self.services,
                    cancel,
                    workdir,
                    bytes,
                    Some(filename),
                    Some(mime),
                );
                self.run_plan(plan, &ctx).await
            }

            _ => Err(AuditError::InputInvalid(
                "input shape does not match its classification".to_string(),
            )),
        }
    }

    fn web_plan(&self) -> Vec<Box<dyn Extractor>> {
        let mut plan: Vec<Box<dyn Extractor>> =
            vec![Box::new(web::ReaderProxy), Box::new(web::ReadabilityLocal)];
        if self.services.config.enable_headless_browser {
            plan.push(Box::new(browser::HeadlessBrowser));
        }
        plan.push(Box::new(web::MetadataOnly));
        plan
    }

    async fn run_plan(
        &self,
        plan: Vec<Box<dyn Extractor>>,
        ctx: &ExtractCtx<'_>,
    ) -> Result<ExtractedContent, AuditError> {
        let result = extract::run_strategies(&plan, ctx).await?;
        Ok(ExtractedContent {
            raw: result.extraction.text.clone(),
            cleaned: result.cleaned,
            translated: None,
            source_type: result.extraction.source_type,
            content_format: result.extraction.content_format,
            extraction_method: result.extraction.method,
            language: crate::core::types::Language::Unknown,
            metadata_only: result.extraction.metadata_only,
        })
    }

    /// Persist the audit record. Best-effort: failures are logged, never
    /// surfaced.
    async fn persist(
        &self,
        outcome: &AuditOutcome,
        input: &Input,
        kind: Kind,
        options: &AuditOptions,
        extracted: &ExtractedContent,
    ) {
        let original_input = match input {
            Input::Text { body } => body.chars().take(MAX_STORED_INPUT_CHARS).collect(),
            Input::Url { href } => href.clone(),
            Input::File { filename, mime, .. } => format!("{filename} ({mime})"),
        };
        let transcript = if extracted.content_format == ContentFormat::Speech {
            extracted.cleaned.clone()
        } else {
            String::new()
        };

        let record = AuditRecord {
            id: outcome.id.clone(),
            user_id: options.user_id.clone(),
            content_type: kind.as_str().to_string(),
            original_input,
            extracted_text: extracted.cleaned.clone(),
            transcript,
            audit_result: outcome.report.clone(),
            created_at: chrono::Utc::now(),
        };

        if let Err(e) = self.services.store.save(record).await {
            warn!(audit_id = %outcome.id, "audit record not persisted: {e}");
        }
    }
}

fn parse_url(href: &str) -> Result<Url, AuditError> {
    Url::parse(href).map_err(|e| AuditError::InputInvalid(format!("malformed URL: {e}")))
}
