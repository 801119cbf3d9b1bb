//! Thin adapters to the external model vendors. Everything interesting
//! (routing, timeouts, fallback, repair) lives behind the capability traits
//! in `core::services`; these just speak the wire formats.

pub mod openai;
pub mod tesseract;
pub mod whisper;

pub use openai::OpenAiReasoner;
pub use tesseract::TesseractOcr;
pub use whisper::WhisperTranscriber;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::error::AuditError;
use crate::core::services::Ocr;

/// Stand-in used when the OCR tools are not installed. Image and scanned-PDF
/// audits fail cleanly; everything else is unaffected.
pub struct UnavailableOcr;

#[async_trait]
impl Ocr for UnavailableOcr {
    async fn recognize_image(
        &self,
        _image: &[u8],
        _languages: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        Err(AuditError::Unsupported(
            "OCR unavailable: install tesseract and poppler".to_string(),
        ))
    }

    async fn recognize_pdf_page(
        &self,
        _pdf: &[u8],
        _page: u32,
        _scale: f32,
        _languages: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, AuditError> {
        Err(AuditError::Unsupported(
            "OCR unavailable: install tesseract and poppler".to_string(),
        ))
    }
}
