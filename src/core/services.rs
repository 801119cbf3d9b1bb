use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::core::config::PipelineConfig;
use crate::core::error::AuditError;
use crate::rules::RuleRepository;
use crate::store::AuditStore;

// ---------------------------------------------------------------------------
// External capability seams
// ---------------------------------------------------------------------------

/// Generation parameters for a single reasoner call. Uniform across models:
/// deterministic output, JSON response when auditing, plain text when
/// translating.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub json_response: bool,
}

impl GenerationConfig {
    pub fn audit(max_output_tokens: u32) -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.95,
            max_output_tokens: max_output_tokens.clamp(1_500, 8_192),
            json_response: true,
        }
    }

    pub fn translation() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.95,
            max_output_tokens: 1_500,
            json_response: false,
        }
    }
}

/// One fully-templated reasoner call.
#[derive(Debug, Clone)]
pub struct ReasonRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub config: GenerationConfig,
}

/// The external structured-generation model. Implementations must be safe
/// for concurrent calls; the adapter layer owns timeouts and fallback.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// One-shot generation. Returns the raw model text (which for audit
    /// calls should be JSON, but is treated as adversarial either way).
    async fn generate(&self, request: &ReasonRequest) -> Result<String, AuditError>;
}

/// Speech-to-text over an audio buffer.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, AuditError>;
}

/// Optical character recognition capability. Page rendering for scanned
/// PDFs is part of the capability so the core never shells out itself.
/// `cancel` is the request's cancellation signal; implementations must stop
/// any subprocess they spawned when it fires.
#[async_trait]
pub trait Ocr: Send + Sync {
    async fn recognize_image(
        &self,
        image: &[u8],
        languages: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuditError>;

    /// Render one PDF page at `scale` and OCR it.
    async fn recognize_pdf_page(
        &self,
        pdf: &[u8],
        page: u32,
        scale: f32,
        languages: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuditError>;
}

// ---------------------------------------------------------------------------
// Services record
// ---------------------------------------------------------------------------

/// Process-wide shared services, initialized once and reused across
/// requests. Everything here is safe for concurrent calls; the pipeline
/// holds no mutable state between requests.
#[derive(Clone)]
pub struct Services {
    pub http: reqwest::Client,
    pub config: Arc<PipelineConfig>,
    pub reasoner: Arc<dyn Reasoner>,
    pub transcriber: Arc<dyn Transcriber>,
    pub ocr: Arc<dyn Ocr>,
    pub rules: Arc<RuleRepository>,
    pub store: Arc<dyn AuditStore>,
    // Caps concurrent outbound calls (fetches, model calls) across requests.
    pub outbound_limit: Arc<Semaphore>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("outbound_permits", &self.outbound_limit.available_permits())
            .finish()
    }
}

impl Services {
    pub fn new(
        config: Arc<PipelineConfig>,
        reasoner: Arc<dyn Reasoner>,
        transcriber: Arc<dyn Transcriber>,
        ocr: Arc<dyn Ocr>,
        store: Arc<dyn AuditStore>,
    ) -> Result<Self, AuditError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AuditError::FetchNetwork(format!("failed to build HTTP client: {e}")))?;

        let rules = Arc::new(RuleRepository::new(config.rules_dir.clone()));
        let outbound_limit = Arc::new(Semaphore::new(config.outbound_limit));

        Ok(Self {
            http,
            config,
            reasoner,
            transcriber,
            ocr,
            rules,
            store,
            outbound_limit,
        })
    }
}
