use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One piece of marketing content submitted for audit.
#[derive(Debug, Clone)]
pub enum Input {
    Text {
        body: String,
    },
    Url {
        href: String,
    },
    File {
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Jurisdiction {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Per-request audit options. `user_id` is required; the pipeline fails with
/// `Unauthenticated` when it is empty.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub user_id: String,
    pub category: String,
    pub jurisdiction: Jurisdiction,
    pub analysis_mode: String,
}

/// What the fingerprint step decided this input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,
    WebPage,
    YouTube,
    MediaUrl,
    Image,
    Audio,
    Video,
    Document,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Text => "text",
            Kind::WebPage => "webpage",
            Kind::YouTube => "url",
            Kind::MediaUrl => "url",
            Kind::Image => "image",
            Kind::Audio => "audio",
            Kind::Video => "video",
            Kind::Document => "document",
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A single regulatory rule, loaded read-only from a rule-pack file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub regulation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub title: String,
    #[serde(default)]
    pub jurisdiction_path: String,
}

/// An ordered rule list filtered by `(country, region?, category)`.
#[derive(Debug, Clone, Default)]
pub struct RulePack {
    pub country: String,
    pub region: Option<String>,
    pub category: String,
    pub rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Extracted content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Blog,
    Youtube,
    Media,
    Upload,
    Transcript,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Blog => "blog",
            SourceType::Youtube => "youtube",
            SourceType::Media => "media",
            SourceType::Upload => "upload",
            SourceType::Transcript => "transcript",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Article,
    Speech,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Article => "article",
            ContentFormat::Speech => "speech",
        }
    }
}

/// Detected language of the cleaned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    En,
    Hi,
    Mixed,
    Unknown,
    Other(String),
}

impl Language {
    pub fn code(&self) -> &str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Mixed => "mixed",
            Language::Unknown => "unknown",
            Language::Other(code) => code,
        }
    }

    /// Languages the translator handles before the reasoner call.
    pub fn needs_translation(&self) -> bool {
        matches!(self, Language::Hi | Language::Mixed)
    }
}

/// Output of one successful extraction strategy, enriched monotonically by
/// cleaner → detector → translator before the reasoner call.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub raw: String,
    pub cleaned: String,
    pub translated: Option<String>,
    pub source_type: SourceType,
    pub content_format: ContentFormat,
    pub extraction_method: String,
    pub language: Language,
    /// True when only `<meta>` tags (or equivalent) were available; exempts
    /// the content from the minimum-length requirement.
    pub metadata_only: bool,
}

/// Metadata handed to the reasoner prompt alongside the reduced content.
#[derive(Debug, Clone)]
pub struct ContentMetadata {
    pub source_type: SourceType,
    pub content_format: ContentFormat,
    pub language: Language,
    pub extraction_method: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "CRITICAL")]
    Critical,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "LOW")]
    Low,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Severity::Critical),
            "HIGH" => Some(Severity::High),
            "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }

    /// Default risk score when the reasoner omitted one.
    pub fn default_risk_score(&self) -> u8 {
        match self {
            Severity::Critical => 90,
            Severity::High => 70,
            Severity::Medium => 50,
            Severity::Low => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    #[serde(rename = "Needs Review")]
    NeedsReview,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialPenalty {
    pub risk_level: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthicalMarketing {
    pub score: u8,
    pub assessment: String,
}

/// One detected violation. All user-visible strings stay in the source
/// language except `regulation`, which is always English.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub regulation: String,
    pub violation_title: String,
    pub evidence: String,
    pub translation: String,
    pub guidance: Vec<String>,
    pub fix: Vec<String>,
    pub risk_score: u8,
}

/// The canonical audit report returned to the caller and persisted once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub score: u8,
    pub status: ComplianceStatus,
    pub summary: String,
    /// Echo of the cleaned (or translated) text the audit ran on; may be empty.
    pub transcription: String,
    pub financial_penalty: FinancialPenalty,
    pub ethical_marketing: EthicalMarketing,
    pub violations: Vec<Violation>,
    pub model_used: String,
    pub used_fallback: bool,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Report {
    /// Structured shell returned when even the fallback reasoner failed.
    /// The pipeline never crashes; it answers with this instead.
    pub fn error_shell(error: &str, message: &str, processing_time_ms: u64) -> Self {
        Self {
            score: 0,
            status: ComplianceStatus::NeedsReview,
            summary: "Analysis unavailable.".to_string(),
            transcription: String::new(),
            financial_penalty: FinancialPenalty {
                risk_level: RiskLevel::None,
                description: "Not assessed.".to_string(),
            },
            ethical_marketing: EthicalMarketing {
                score: 0,
                assessment: "Not assessed.".to_string(),
            },
            violations: Vec::new(),
            model_used: "none".to_string(),
            used_fallback: false,
            processing_time_ms,
            error: Some(error.to_string()),
            message: Some(message.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// The record handed to the external audit store. Opaque to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub user_id: String,
    pub content_type: String,
    pub original_input: String,
    pub extracted_text: String,
    pub transcript: String,
    pub audit_result: Report,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
