use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// PipelineConfig: env-driven config, built once at startup
// ---------------------------------------------------------------------------

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    let Ok(v) = std::env::var(key) else {
        return default;
    };
    let v = v.trim().to_ascii_lowercase();
    if v.is_empty() {
        return default;
    }
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Model routing knobs. A single default model is always acceptable; light /
/// heavy / fallback are optional refinements on top of it.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub default_model: String,
    pub light_model: Option<String>,
    pub heavy_model: Option<String>,
    pub fallback_model: Option<String>,
}

impl ModelConfig {
    fn from_env() -> Self {
        let opt = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            default_model: env_string("REASONER_MODEL", "gpt-4o-mini"),
            light_model: opt("REASONER_LIGHT_MODEL"),
            heavy_model: opt("REASONER_HEAVY_MODEL"),
            fallback_model: opt("REASONER_FALLBACK_MODEL"),
        }
    }
}

/// All tunables the pipeline reads. Built once in `main` (or a test) and
/// shared via the services record; no component reads the environment on its
/// own after startup.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    // Router thresholds
    pub short_threshold: usize,
    pub long_threshold: usize,

    // Content caps
    pub max_content_for_ai: usize,
    pub max_text_length: usize,
    pub max_media_size: u64,
    pub min_cleaned: usize,
    pub min_strategy_chars: usize,

    // Document path
    pub min_pdf_chars: usize,
    pub max_pdf_pages: u32,
    pub ocr_languages: String,

    // Feature flags
    pub enable_headless_browser: bool,
    pub enable_audio_download: bool,
    pub enable_failsafe_reanalysis: bool,

    // Jurisdiction / rule packs
    pub jurisdiction_default: String,
    pub rules_dir: PathBuf,

    // External endpoints
    pub reader_proxy_base: String,

    // Deadlines
    pub fetch_timeout: Duration,
    pub reasoner_timeout: Duration,
    pub transcribe_timeout: Duration,
    pub audio_download_timeout: Duration,
    pub pdf_render_budget: Duration,

    // Retries
    pub max_retries: u32,
    pub backoff_base: Duration,

    // Concurrency
    pub outbound_limit: usize,

    pub models: ModelConfig,
}

impl PipelineConfig {
    /// Load from the environment with documented defaults. Missing or
    /// unparsable variables silently fall back; this is the only place the
    /// pipeline touches `std::env`.
    pub fn from_env() -> Self {
        Self {
            short_threshold: env_usize("SHORT_THRESHOLD", 3_000),
            long_threshold: env_usize("LONG_THRESHOLD", 10_000),
            max_content_for_ai: env_usize("MAX_CONTENT_FOR_AI", 10_000),
            max_text_length: env_usize("MAX_TEXT_LENGTH", 100_000),
            max_media_size: env_u64("MAX_MEDIA_SIZE", 100 * 1024 * 1024),
            min_cleaned: env_usize("MIN_CLEANED", 40),
            min_strategy_chars: 300,
            min_pdf_chars: env_usize("MIN_PDF_CHARS", 500),
            max_pdf_pages: env_u32("MAX_PDF_PAGES", 25),
            ocr_languages: env_string("OCR_LANGUAGES", "eng+hin"),
            enable_headless_browser: env_bool("ENABLE_HEADLESS_BROWSER", false),
            enable_audio_download: env_bool("ENABLE_AUDIO_DOWNLOAD", false),
            enable_failsafe_reanalysis: env_bool("ENABLE_FAILSAFE_REANALYSIS", true),
            jurisdiction_default: env_string("JURISDICTION_DEFAULT", "India"),
            rules_dir: PathBuf::from(env_string("RULES_DIR", "rules")),
            reader_proxy_base: env_string("READER_PROXY_BASE", "https://r.jina.ai"),
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECS", 60)),
            reasoner_timeout: Duration::from_secs(env_u64("REASONER_TIMEOUT_SECS", 30)),
            transcribe_timeout: Duration::from_secs(env_u64("TRANSCRIBE_TIMEOUT_SECS", 180)),
            audio_download_timeout: Duration::from_secs(env_u64(
                "AUDIO_DOWNLOAD_TIMEOUT_SECS",
                120,
            )),
            pdf_render_budget: Duration::from_secs(env_u64("PDF_RENDER_BUDGET_SECS", 120)),
            max_retries: env_u32("MAX_RETRIES", 2),
            backoff_base: Duration::from_millis(env_u64("BACKOFF_BASE_MS", 800)),
            outbound_limit: env_usize("OUTBOUND_LIMIT", 32),
            models: ModelConfig::from_env(),
        }
    }

    /// A config with all documented defaults, independent of the process
    /// environment. Used by tests so parallel test runs cannot interfere
    /// through env mutation.
    pub fn defaults() -> Self {
        Self {
            short_threshold: 3_000,
            long_threshold: 10_000,
            max_content_for_ai: 10_000,
            max_text_length: 100_000,
            max_media_size: 100 * 1024 * 1024,
            min_cleaned: 40,
            min_strategy_chars: 300,
            min_pdf_chars: 500,
            max_pdf_pages: 25,
            ocr_languages: "eng+hin".to_string(),
            enable_headless_browser: false,
            enable_audio_download: false,
            enable_failsafe_reanalysis: true,
            jurisdiction_default: "India".to_string(),
            rules_dir: PathBuf::from("rules"),
            reader_proxy_base: "https://r.jina.ai".to_string(),
            fetch_timeout: Duration::from_secs(60),
            reasoner_timeout: Duration::from_secs(30),
            transcribe_timeout: Duration::from_secs(180),
            audio_download_timeout: Duration::from_secs(120),
            pdf_render_budget: Duration::from_secs(120),
            max_retries: 2,
            backoff_base: Duration::from_millis(800),
            outbound_limit: 32,
            models: ModelConfig {
                default_model: "gpt-4o-mini".to_string(),
                light_model: None,
                heavy_model: None,
                fallback_model: None,
            },
        }
    }
}
