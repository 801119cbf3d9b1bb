//! Tesseract-CLI adapter for the OCR seam.
//!
//! Images go straight to `tesseract`; scanned PDF pages are rendered with
//! `pdftoppm` first. Every invocation works inside its own scratch
//! directory, removed on all exit paths including mid-flight drops.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::error::AuditError;
use crate::core::services::Ocr;
use crate::procutil;

const OCR_DEADLINE: Duration = Duration::from_secs(110);
const RENDER_DEADLINE: Duration = Duration::from_secs(60);

/// Base rendering resolution; a scale of 1.0 maps to 72 dpi.
const BASE_DPI: f32 = 72.0;

pub struct TesseractOcr {
    tesseract: PathBuf,
    pdftoppm: PathBuf,
}

impl TesseractOcr {
    /// Locate the external tools; fails fast at startup when they are absent.
    pub fn discover() -> Result<Self, AuditError> {
        let tesseract = which::which("tesseract")
            .map_err(|_| AuditError::FetchNetwork("tesseract not installed".to_string()))?;
        let pdftoppm = which::which("pdftoppm")
            .map_err(|_| AuditError::FetchNetwork("pdftoppm (poppler) not installed".to_string()))?;
        Ok(Self {
            tesseract,
            pdftoppm,
        })
    }

    async fn run_tesseract(
        &self,
        workdir: &std::path::Path,
        image: &str,
        languages: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        let out = procutil::run(
            &self.tesseract,
            &[image, "stdout", "-l", languages],
            workdir,
            OCR_DEADLINE,
            cancel,
        )
        .await?;
        if !out.success() {
            return Err(AuditError::FetchNetwork(format!(
                "tesseract exited with {:?}: {}",
                out.status_code,
                out.stderr.lines().last().unwrap_or("")
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl Ocr for TesseractOcr {
    async fn recognize_image(
        &self,
        image: &[u8],
        languages: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| AuditError::FetchNetwork(format!("scratch dir: {e}")))?;
        let image_path = scratch.path().join("input.img");
        tokio::fs::write(&image_path, image)
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("write image: {e}")))?;

        self.run_tesseract(scratch.path(), "input.img", languages, cancel)
            .await
    }

    async fn recognize_pdf_page(
        &self,
        pdf: &[u8],
        page: u32,
        scale: f32,
        languages: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| AuditError::FetchNetwork(format!("scratch dir: {e}")))?;
        tokio::fs::write(scratch.path().join("input.pdf"), pdf)
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("write pdf: {e}")))?;

        // pdftoppm pages are 1-based.
        let page_arg = (page + 1).to_string();
        let dpi = ((BASE_DPI * scale).round() as u32).to_string();
        let render = procutil::run(
            &self.pdftoppm,
            &[
                "-f",
                page_arg.as_str(),
                "-l",
                page_arg.as_str(),
                "-r",
                dpi.as_str(),
                "-png",
                "input.pdf",
                "page",
            ],
            scratch.path(),
            RENDER_DEADLINE,
            cancel,
        )
        .await?;

        // Output name padding depends on the document's page count; scan for
        // whatever PNG the render produced.
        let mut rendered = None;
        if let Ok(mut entries) = tokio::fs::read_dir(scratch.path()).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with("page") && name.ends_with(".png") {
                    rendered = Some(name);
                    break;
                }
            }
        }

        let Some(rendered) = rendered else {
            return Err(AuditError::InputInvalid(format!(
                "PDF page {page} not renderable: {}",
                render.stderr.lines().last().unwrap_or("no output produced")
            )));
        };

        self.run_tesseract(scratch.path(), &rendered, languages, cancel)
            .await
    }
}
