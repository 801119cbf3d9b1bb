//! Office-document and PDF extraction.
//!
//! PDFs try embedded text first; scanned documents fall back to per-page
//! rendering + OCR. DOCX is unpacked and read from `word/document.xml`;
//! legacy DOC falls back to printable-text salvage.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::{ExtractCtx, Extraction, Extractor};

/// Scale factor for rendering scanned PDF pages before OCR.
const PDF_OCR_SCALE: f32 = 2.0;

// ---------------------------------------------------------------------------
// PdfTextThenOcr
// ---------------------------------------------------------------------------

/// Embedded PDF text, with per-page OCR fallback for scanned documents.
pub struct PdfTextThenOcr;

impl PdfTextThenOcr {
    async fn embedded_text(bytes: Vec<u8>) -> Result<String, AuditError> {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("pdf task: {e}")))?
            .map_err(|e| AuditError::InputInvalid(format!("unreadable PDF: {e}")))
    }

    async fn ocr_pages(ctx: &ExtractCtx<'_>, pdf: &[u8]) -> Result<String, AuditError> {
        let config = &ctx.services.config;
        let languages = config.ocr_languages.clone();
        let mut pages = Vec::new();

        let ocr_all = async {
            for page in 0..config.max_pdf_pages {
                if ctx.cancel.is_cancelled() {
                    return Err(AuditError::Cancelled);
                }
                match ctx
                    .services
                    .ocr
                    .recognize_pdf_page(pdf, page, PDF_OCR_SCALE, &languages, &ctx.cancel)
                    .await
                {
                    Ok(text) => {
                        if !text.trim().is_empty() {
                            pages.push(text);
                        }
                    }
                    // Past the last page; rendering reports it as an error.
                    Err(AuditError::InputInvalid(_)) if page > 0 => break,
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        };

        match tokio::time::timeout(config.pdf_render_budget, ocr_all).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                // Budget exhausted: keep whatever pages finished.
                warn!(
                    pages = pages.len(),
                    "PDF OCR budget exhausted, using partial result"
                );
            }
        }

        if pages.is_empty() {
            return Err(AuditError::ContentTooShort { len: 0 });
        }
        Ok(pages.join("\n\n"))
    }
}

#[async_trait]
impl Extractor for PdfTextThenOcr {
    fn name(&self) -> &'static str {
        "pdf_text_then_ocr"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(30 + 120 + 10)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let bytes = ctx.require_bytes()?;
        let min_chars = ctx.services.config.min_pdf_chars;

        let embedded = match Self::embedded_text(bytes.to_vec()).await {
            Ok(text) => text,
            Err(e) => {
                warn!("embedded PDF text extraction failed: {e}");
                String::new()
            }
        };

        if embedded.chars().count() >= min_chars {
            info!(chars = embedded.len(), "PDF embedded text sufficient");
            return Ok(Extraction::new(
                embedded,
                "pdf_text",
                SourceType::Upload,
                ContentFormat::Article,
            ));
        }

        info!(
            embedded_chars = embedded.chars().count(),
            min_chars, "embedded text below threshold, running page OCR"
        );
        let ocr_text = Self::ocr_pages(ctx, bytes).await?;

        // Keep the embedded fragment when it adds anything.
        let text = if embedded.trim().is_empty() {
            ocr_text
        } else {
            format!("{embedded}\n\n{ocr_text}")
        };

        Ok(Extraction::new(
            text,
            "pdf_ocr",
            SourceType::Upload,
            ContentFormat::Article,
        ))
    }
}

// ---------------------------------------------------------------------------
// DocxText
// ---------------------------------------------------------------------------

/// Raw text from an OOXML word-processing document.
pub struct DocxText;

pub(crate) fn docx_to_text(bytes: &[u8]) -> Result<String, AuditError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AuditError::InputInvalid(format!("not a DOCX container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AuditError::InputInvalid(format!("DOCX missing document body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| AuditError::InputInvalid(format!("DOCX body unreadable: {e}")))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                out.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AuditError::InputInvalid(format!("DOCX XML error: {e}")));
            }
            _ => {}
        }
    }

    Ok(out)
}

#[async_trait]
impl Extractor for DocxText {
    fn name(&self) -> &'static str {
        "docx_text"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let bytes = ctx.require_bytes()?.to_vec();
        let text = tokio::task::spawn_blocking(move || docx_to_text(&bytes))
            .await
            .map_err(|e| AuditError::InputInvalid(format!("docx task: {e}")))??;

        if text.trim().is_empty() {
            return Err(AuditError::ContentTooShort { len: 0 });
        }

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Upload,
            ContentFormat::Article,
        ))
    }
}

// ---------------------------------------------------------------------------
// DocText
// ---------------------------------------------------------------------------

/// Legacy binary `.doc` salvage: collect printable runs from both the raw
/// byte stream and its UTF-16LE interpretation, keep whichever reads better.
pub struct DocText;

fn salvage_ascii(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for &b in bytes {
        let c = b as char;
        if c.is_ascii_graphic() || c == ' ' {
            run.push(c);
        } else {
            if run.trim().split_whitespace().count() >= 2 && run.len() >= 8 {
                out.push_str(run.trim());
                out.push('\n');
            }
            run.clear();
        }
    }
    out
}

fn salvage_utf16le(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();
    for pair in bytes.chunks_exact(2) {
        let code = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(code as u32) {
            Some(c) if !c.is_control() && code != 0 => run.push(c),
            _ => {
                if run.trim().split_whitespace().count() >= 2 && run.len() >= 8 {
                    out.push_str(run.trim());
                    out.push('\n');
                }
                run.clear();
            }
        }
    }
    out
}

#[async_trait]
impl Extractor for DocText {
    fn name(&self) -> &'static str {
        "doc_text"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let bytes = ctx.require_bytes()?.to_vec();
        let text = tokio::task::spawn_blocking(move || {
            let ascii = salvage_ascii(&bytes);
            let wide = salvage_utf16le(&bytes);
            if wide.split_whitespace().count() > ascii.split_whitespace().count() {
                wide
            } else {
                ascii
            }
        })
        .await
        .map_err(|e| AuditError::InputInvalid(format!("doc task: {e}")))?;

        if text.trim().is_empty() {
            return Err(AuditError::ContentTooShort { len: 0 });
        }

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Upload,
            ContentFormat::Article,
        ))
    }
}
